use std::cell::{Cell, RefCell};

/// Callbacks for `SYNC` work, drained from a host microtask.
///
/// Flushing is not re-entrant: a flush requested while one is running
/// returns immediately and the running flush picks up the new callbacks.
#[derive(Default)]
pub(crate) struct SyncQueue {
    callbacks: RefCell<Vec<Box<dyn FnOnce()>>>,
    flushing: Cell<bool>,
}

struct FlushGuard<'a>(&'a Cell<bool>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl SyncQueue {
    pub(crate) fn push(&self, callback: Box<dyn FnOnce()>) {
        self.callbacks.borrow_mut().push(callback);
    }

    pub(crate) fn flush(&self) {
        if self.flushing.replace(true) {
            return;
        }
        let _guard = FlushGuard(&self.flushing);
        loop {
            let batch = std::mem::take(&mut *self.callbacks.borrow_mut());
            if batch.is_empty() {
                break;
            }
            for callback in batch {
                callback();
            }
        }
    }
}

//! Task scheduler abstraction consumed by the work loop.
//!
//! The engine never owns an event loop. It asks the host platform to run
//! callbacks at a priority, checks whether it should yield between units of
//! work, and cancels callbacks that became stale. Implementations are
//! single-threaded and use interior mutability.

/// Discrete priority levels understood by the task scheduler.
///
/// Ordered from most to least urgent, so `Ord` sorts urgent work first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SchedulerPriority {
    Immediate,
    UserBlocking,
    Normal,
    Low,
    Idle,
}

/// Opaque handle for a scheduled callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskToken(pub u64);

/// What a scheduled callback wants after it returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    /// The callback finished its work.
    Done,
    /// The callback yielded; run it again later under the same token.
    Continue,
}

/// Callback run by the scheduler. The argument reports whether the task
/// exceeded its deadline.
pub type SchedulerCallback = Box<dyn FnMut(bool) -> TaskStatus>;

/// Priority task scheduler used for time-sliced rendering and passive
/// effect flushes.
pub trait TaskScheduler {
    /// Queue `callback` at `priority`.
    fn schedule_callback(&self, priority: SchedulerPriority, callback: SchedulerCallback)
        -> TaskToken;

    /// Cancel a callback. Cancelling an unknown or finished token is a no-op.
    fn cancel_callback(&self, token: TaskToken);

    /// Whether the current time slice is exhausted.
    fn should_yield(&self) -> bool;

    /// Priority of the task currently running, or the ambient priority.
    fn current_priority(&self) -> SchedulerPriority;

    /// Run `f` with the current priority temporarily set to `priority`.
    fn run_with_priority(&self, priority: SchedulerPriority, f: &mut dyn FnMut());
}

/// Convenience wrapper over [`TaskScheduler::run_with_priority`] that returns
/// the closure's result.
pub fn run_with_priority<R>(
    scheduler: &dyn TaskScheduler,
    priority: SchedulerPriority,
    f: impl FnOnce() -> R,
) -> Option<R> {
    let mut f = Some(f);
    let mut result = None;
    scheduler.run_with_priority(priority, &mut || {
        if let Some(f) = f.take() {
            result = Some(f());
        }
    });
    result
}

use std::any::Any;
use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::element::{ElementBuilder, ElementType};
use crate::props::PropValue;

static NEXT_CONTEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ContextId(usize);

/// A value threaded down the tree by providers and read with `use_context`.
pub struct Context<T> {
    id: ContextId,
    default: Rc<T>,
}

impl<T> Clone for Context<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            default: Rc::clone(&self.default),
        }
    }
}

pub fn create_context<T: 'static>(default: T) -> Context<T> {
    Context {
        id: ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed)),
        default: Rc::new(default),
    }
}

impl<T: 'static> Context<T> {
    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Provider element; add children on the returned builder.
    pub fn provider(&self, value: T) -> ElementBuilder {
        let value: Rc<dyn Any> = Rc::new(value);
        ElementBuilder::new(ElementType::Provider(self.id))
            .attr(PROVIDER_VALUE, PropValue::Any(value))
    }
}

pub(crate) const PROVIDER_VALUE: &str = "value";

/// Values pushed by providers on the path from the root to the fiber being
/// rendered.
#[derive(Default)]
pub(crate) struct ContextStack {
    entries: Vec<(ContextId, Rc<dyn Any>)>,
}

impl ContextStack {
    pub(crate) fn push(&mut self, id: ContextId, value: Rc<dyn Any>) {
        self.entries.push((id, value));
    }

    pub(crate) fn pop(&mut self, id: ContextId) {
        match self.entries.pop() {
            Some((top, _)) if top == id => {}
            Some((top, _)) => {
                log::warn!("context stack mismatch: popped {top:?} while completing {id:?}");
            }
            None => log::warn!("context stack underflow while completing {id:?}"),
        }
    }

    pub(crate) fn read(&self, id: ContextId) -> Option<Rc<dyn Any>> {
        self.entries
            .iter()
            .rev()
            .find(|(entry, _)| *entry == id)
            .map(|(_, value)| Rc::clone(value))
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

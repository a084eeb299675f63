use std::cell::{Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use crate::host::HostId;

/// Shared mutable cell returned by `use_ref` and used for object refs.
///
/// Cloning the handle shares the value. Identity survives re-renders, so a
/// component sees the same cell on every invocation.
pub struct MutableRef<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for MutableRef<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for MutableRef<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MutableRef").field(&*self.inner.borrow()).finish()
    }
}

impl<T> MutableRef<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    /// Run `f` with an immutable reference to the stored value.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let borrow = self.inner.borrow();
        f(&borrow)
    }

    /// Run `f` with a mutable reference to the stored value.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut borrow = self.inner.borrow_mut();
        f(&mut borrow)
    }

    pub fn borrow(&self) -> Ref<'_, T> {
        self.inner.borrow()
    }

    pub fn borrow_mut(&self) -> RefMut<'_, T> {
        self.inner.borrow_mut()
    }

    pub fn replace(&self, new_value: T) -> T {
        self.inner.replace(new_value)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: Clone> MutableRef<T> {
    pub fn get(&self) -> T {
        self.inner.borrow().clone()
    }
}

/// Ref attached to a host element descriptor.
#[derive(Clone)]
pub enum HostRef {
    Object(MutableRef<Option<HostId>>),
    Callback(Rc<dyn Fn(Option<HostId>)>),
}

impl HostRef {
    /// Creates an object ref and returns it with the cell it writes to.
    pub fn object() -> (HostRef, MutableRef<Option<HostId>>) {
        let cell = MutableRef::new(None);
        (HostRef::Object(cell.clone()), cell)
    }

    pub fn callback(f: impl Fn(Option<HostId>) + 'static) -> HostRef {
        HostRef::Callback(Rc::new(f))
    }

    pub(crate) fn attach(&self, instance: HostId) {
        match self {
            HostRef::Object(cell) => {
                cell.replace(Some(instance));
            }
            HostRef::Callback(callback) => callback(Some(instance)),
        }
    }

    pub(crate) fn detach(&self) {
        match self {
            HostRef::Object(cell) => {
                cell.replace(None);
            }
            HostRef::Callback(callback) => callback(None),
        }
    }
}

impl PartialEq for HostRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostRef::Object(a), HostRef::Object(b)) => a.ptr_eq(b),
            (HostRef::Callback(a), HostRef::Callback(b)) => {
                Rc::as_ptr(a) as *const u8 == Rc::as_ptr(b) as *const u8
            }
            _ => false,
        }
    }
}

impl fmt::Debug for HostRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostRef::Object(cell) => write!(f, "HostRef::Object({:?})", cell.get()),
            HostRef::Callback(_) => f.write_str("HostRef::Callback(..)"),
        }
    }
}

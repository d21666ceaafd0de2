#![forbid(unsafe_code)]

//! Secret-gated sub-entries inside per-object hidden storage.
//!
//! Each [`NamespacedLock`] reserves a fresh sub-entry key and owns an opaque
//! secret. The sub-entry it installs on an object is a closure that hands
//! out the lock's [`DataCell`] only when called with that exact secret, so
//! knowing the key (or even reaching the hidden store) is never enough to
//! read or replace another lock's data.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;

use crate::error::{CoreError, Result};
use crate::object::ObjectRef;
use crate::slot::{self, Accessor};
use crate::token;

/// Identity-only capability. Compared by address, never inspected.
pub(crate) struct Secret {
    _opaque: (),
}

/// Content of a lock's cell for one object.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry<T> {
    /// Nothing has been stored, or the value was removed.
    Unset,
    Set(T),
}

impl<T> Entry<T> {
    #[must_use]
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    /// Clear the entry, returning what was there.
    pub fn take(&mut self) -> Option<T> {
        match std::mem::replace(self, Self::Unset) {
            Self::Set(value) => Some(value),
            Self::Unset => None,
        }
    }

    #[must_use]
    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Set(value) => Some(value),
            Self::Unset => None,
        }
    }
}

/// The one-field box shared between a lock and one object.
pub type DataCell<T> = Rc<RefCell<Entry<T>>>;

/// Access-control namespace within every object's hidden storage.
pub struct NamespacedLock<T> {
    key: String,
    secret: Rc<Secret>,
    _marker: PhantomData<fn() -> T>,
}

impl<T: 'static> NamespacedLock<T> {
    #[must_use]
    pub fn new() -> Self {
        let key = token::new_token();
        tracing::trace!(message = "lock.reserve", key = %key);
        Self {
            key,
            secret: Rc::new(Secret { _opaque: () }),
            _marker: PhantomData,
        }
    }

    /// Return this lock's cell on `obj`, creating it (unset) on first use.
    pub fn unlock(&self, obj: &ObjectRef) -> Result<DataCell<T>> {
        let store = slot::store_for(obj)?;
        {
            let store = store.borrow();
            if let Some(accessor) = store.get(&self.key) {
                return accessor(&self.secret)
                    .and_then(|released| released.downcast::<RefCell<Entry<T>>>().ok())
                    .ok_or(CoreError::NotInitialized);
            }
        }

        let cell: DataCell<T> = Rc::new(RefCell::new(Entry::Unset));
        store
            .borrow_mut()
            .insert(self.key.clone(), self.gate(Rc::clone(&cell)));
        Ok(cell)
    }

    fn gate(&self, cell: DataCell<T>) -> Accessor {
        let secret = Rc::clone(&self.secret);
        let released: Rc<dyn Any> = cell;
        Box::new(move |candidate: &Rc<Secret>| {
            Rc::ptr_eq(candidate, &secret).then(|| Rc::clone(&released))
        })
    }
}

impl<T: Clone + 'static> NamespacedLock<T> {
    /// Current value for `obj`, if set.
    pub fn get(&self, obj: &ObjectRef) -> Result<Option<T>> {
        Ok(self.unlock(obj)?.borrow().value().cloned())
    }
}

impl<T: 'static> Default for NamespacedLock<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for NamespacedLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamespacedLock")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

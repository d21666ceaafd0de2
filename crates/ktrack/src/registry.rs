#![forbid(unsafe_code)]

//! Per-object index of observable handles, keyed by field name.
//!
//! The registry is an [`AssociationStore`] whose value for a tracked object
//! is a shared field-name map. The map is created when the first field of an
//! object is tracked and grows as more fields are tracked; it is never
//! removed, and goes away with the object.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use ahash::AHashMap;
use ktrack_core::{AssociationStore, CoreError, ObjectRef};

use crate::handle::ObservableHandle;

/// Field name to handle, for one object.
pub type FieldMap<H> = Rc<RefCell<AHashMap<String, H>>>;

pub struct ObservableRegistry<H: ObservableHandle> {
    store: AssociationStore<FieldMap<H>>,
}

impl<H: ObservableHandle> ObservableRegistry<H> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            store: AssociationStore::new(),
        }
    }

    /// The field map of `obj`, if any field of it was ever tracked.
    pub fn fields(&self, obj: &ObjectRef) -> Result<Option<FieldMap<H>>, CoreError> {
        self.store.get(obj)
    }

    /// The field map of `obj`, created empty on first use.
    pub fn fields_or_insert(&self, obj: &ObjectRef) -> Result<FieldMap<H>, CoreError> {
        self.store.get_or_insert_with(obj, Default::default)
    }

    /// Record `handle` for `name`, returning the handle it replaces.
    pub fn register(
        &self,
        obj: &ObjectRef,
        name: &str,
        handle: H,
    ) -> Result<Option<H>, CoreError> {
        let fields = self.fields_or_insert(obj)?;
        let previous = fields.borrow_mut().insert(name.to_string(), handle);
        Ok(previous)
    }

    /// The handle registered for `name` on `obj`.
    ///
    /// Lookups are queries: any failure reads as "not tracked".
    #[must_use]
    pub fn lookup(&self, obj: &ObjectRef, name: &str) -> Option<H> {
        let fields = self.fields(obj).ok().flatten()?;
        let handle = fields.borrow().get(name).cloned();
        handle
    }

    /// Tracked field names of `obj`, sorted.
    #[must_use]
    pub fn tracked_fields(&self, obj: &ObjectRef) -> Vec<String> {
        let Some(fields) = self.fields(obj).ok().flatten() else {
            return Vec::new();
        };
        let mut names: Vec<String> = fields.borrow().keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl<H: ObservableHandle> Default for ObservableRegistry<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: ObservableHandle> fmt::Debug for ObservableRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableRegistry")
            .field("store", &self.store)
            .finish()
    }
}

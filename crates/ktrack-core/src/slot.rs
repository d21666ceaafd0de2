#![forbid(unsafe_code)]

//! Per-object hidden storage.
//!
//! The first time an association store touches an object, a [`PerObjectStore`]
//! is attached to the object itself as a non-enumerable, non-configurable
//! property named by a single process-wide token. The store lives exactly as
//! long as the object does.
//!
//! The reflective enumeration of [`ObjectRef`] is routed through
//! [`exclude_hidden`], so the slot name never surfaces through
//! `own_property_names`, `keys`, copying or serialization.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::OnceLock;

use ahash::AHashMap;

use crate::error::{CoreError, Result};
use crate::lock::Secret;
use crate::object::ObjectRef;
use crate::token;

static HIDDEN_SLOT_NAME: OnceLock<String> = OnceLock::new();

/// Releases a lock's cell only when shown that lock's secret.
pub(crate) type Accessor = Box<dyn Fn(&Rc<Secret>) -> Option<Rc<dyn Any>>>;

pub(crate) fn hidden_slot_name() -> &'static str {
    HIDDEN_SLOT_NAME.get_or_init(token::new_token)
}

pub(crate) fn is_hidden_name(name: &str) -> bool {
    name == hidden_slot_name()
}

/// Drop the hidden slot name from an enumeration result.
pub(crate) fn exclude_hidden(mut names: Vec<String>) -> Vec<String> {
    if let Some(pos) = names.iter().position(|name| is_hidden_name(name)) {
        names.remove(pos);
    }
    names
}

/// Sub-entries of one object's hidden storage, one per namespaced lock.
#[derive(Default)]
pub(crate) struct PerObjectStore {
    entries: AHashMap<String, Accessor>,
}

impl PerObjectStore {
    pub(crate) fn get(&self, key: &str) -> Option<&Accessor> {
        self.entries.get(key)
    }

    pub(crate) fn insert(&mut self, key: String, accessor: Accessor) {
        self.entries.insert(key, accessor);
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Return the hidden store of `obj`, attaching one on first use.
pub(crate) fn store_for(obj: &ObjectRef) -> Result<Rc<RefCell<PerObjectStore>>> {
    let name = hidden_slot_name();
    if let Some(store) = obj.hidden_store(name) {
        return Ok(store);
    }
    if !obj.is_extensible() {
        return Err(CoreError::NotExtensible);
    }
    let store = Rc::new(RefCell::new(PerObjectStore::default()));
    obj.attach_hidden_store(name, Rc::clone(&store))?;
    tracing::trace!(message = "slot.attach", object = obj.id());
    Ok(store)
}

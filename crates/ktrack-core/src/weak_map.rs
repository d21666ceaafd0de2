#![forbid(unsafe_code)]

//! Identity-keyed association store that does not keep its keys alive.
//!
//! # Design
//!
//! [`AssociationStore<T>`] keeps no table of its own. Each value lives in a
//! [`DataCell`](crate::lock::DataCell) inside the key object's hidden storage,
//! reachable only through the store's [`NamespacedLock`]. Dropping the last
//! handle to a key therefore drops everything any store attached to it.
//!
//! Values are owned by their key, so a value that holds a strong reference
//! back to its own key forms an `Rc` cycle and keeps the key alive until the
//! entry is deleted. Store a [`WeakObjectRef`](crate::WeakObjectRef) for such
//! back-references.
//!
//! Every store is also represented by a *collection object*. The store's lock
//! is recorded on that object through a crate-wide lock, which is what
//! [`AssociationStore::wrap`] and [`AssociationStore::from_collection`]
//! operate on.
//!
//! # Invariants
//!
//! 1. Keys must be objects or functions; anything else fails with
//!    [`CoreError::InvalidKey`] before any mutation.
//! 2. A value explicitly set to [`Value::Undefined`] is still *present*:
//!    `has` is true and `delete` reports it.
//! 3. Two stores never observe each other's values, even on the same key.
//! 4. A collection object is wrapped at most once.

use std::any::Any;
use std::fmt;
use std::rc::Rc;

use crate::error::{CoreError, Result};
use crate::lock::{Entry, NamespacedLock};
use crate::object::ObjectRef;
use crate::value::Value;

thread_local! {
    static COLLECTIONS: NamespacedLock<Rc<dyn Any>> = NamespacedLock::new();
}

/// Anything that can be offered as an association key.
pub trait AssociationKey {
    /// The key object, or [`CoreError::InvalidKey`] for primitives.
    fn as_key(&self) -> Result<&ObjectRef>;
}

impl AssociationKey for ObjectRef {
    fn as_key(&self) -> Result<&ObjectRef> {
        Ok(self)
    }
}

impl AssociationKey for Value {
    fn as_key(&self) -> Result<&ObjectRef> {
        self.as_object().ok_or(CoreError::InvalidKey {
            found: self.type_name(),
        })
    }
}

/// Weak-keyed map from object identity to `T`.
///
/// Cloning yields another handle to the same store.
pub struct AssociationStore<T: 'static> {
    collection: ObjectRef,
    data: Rc<NamespacedLock<T>>,
}

impl<T: 'static> AssociationStore<T> {
    /// Create an empty store with a fresh collection object.
    #[must_use]
    pub fn new() -> Self {
        let collection = ObjectRef::new();
        let data = Rc::new(NamespacedLock::new());
        // A fresh collection object is extensible and has never been wrapped.
        let installed = Self::install(&collection, &data);
        debug_assert!(installed.is_ok(), "fresh collection object refused install");
        Self { collection, data }
    }

    /// Initialize `collection` as a store backed by `data`.
    ///
    /// Fails with [`CoreError::AlreadyInitialized`] if `collection` has been
    /// wrapped before.
    pub fn wrap(collection: &ObjectRef, data: NamespacedLock<T>) -> Result<Self> {
        let data = Rc::new(data);
        Self::install(collection, &data)?;
        Ok(Self {
            collection: collection.clone(),
            data,
        })
    }

    /// Recover the store previously wrapped onto `collection`.
    pub fn from_collection(collection: &ObjectRef) -> Result<Self> {
        let data = COLLECTIONS
            .with(|lock| lock.get(collection))?
            .ok_or(CoreError::NotInitialized)?
            .downcast::<NamespacedLock<T>>()
            .map_err(|_| CoreError::NotInitialized)?;
        Ok(Self {
            collection: collection.clone(),
            data,
        })
    }

    /// Create a store pre-populated from `(key, value)` pairs.
    pub fn from_entries(entries: impl IntoIterator<Item = (Value, T)>) -> Result<Self> {
        let store = Self::new();
        for (key, value) in entries {
            store.set(&key, value)?;
        }
        Ok(store)
    }

    fn install(collection: &ObjectRef, data: &Rc<NamespacedLock<T>>) -> Result<()> {
        COLLECTIONS.with(|lock| {
            let cell = lock.unlock(collection)?;
            let mut entry = cell.borrow_mut();
            if entry.is_set() {
                return Err(CoreError::AlreadyInitialized);
            }
            let erased: Rc<dyn Any> = Rc::clone(data) as Rc<dyn Any>;
            *entry = Entry::Set(erased);
            Ok(())
        })?;
        tracing::debug!(message = "weak_map.wrap", collection = collection.id());
        Ok(())
    }

    /// The host object standing for this store.
    #[must_use]
    pub fn collection(&self) -> &ObjectRef {
        &self.collection
    }

    pub fn set<K: AssociationKey + ?Sized>(&self, key: &K, value: T) -> Result<()> {
        let obj = key.as_key()?;
        *self.data.unlock(obj)?.borrow_mut() = Entry::Set(value);
        Ok(())
    }

    pub fn has<K: AssociationKey + ?Sized>(&self, key: &K) -> Result<bool> {
        let obj = key.as_key()?;
        Ok(self.data.unlock(obj)?.borrow().is_set())
    }

    /// Remove the value for `key`. Returns whether one was present.
    pub fn delete<K: AssociationKey + ?Sized>(&self, key: &K) -> Result<bool> {
        let obj = key.as_key()?;
        Ok(self.data.unlock(obj)?.borrow_mut().take().is_some())
    }
}

impl<T: Clone + 'static> AssociationStore<T> {
    pub fn get<K: AssociationKey + ?Sized>(&self, key: &K) -> Result<Option<T>> {
        let obj = key.as_key()?;
        self.data.get(obj)
    }

    /// Return the value for `key`, storing `init()` first if absent.
    ///
    /// `init` runs with no borrow held and may use the store.
    pub fn get_or_insert_with<K: AssociationKey + ?Sized>(
        &self,
        key: &K,
        init: impl FnOnce() -> T,
    ) -> Result<T> {
        let obj = key.as_key()?;
        let cell = self.data.unlock(obj)?;
        if let Some(existing) = cell.borrow().value() {
            return Ok(existing.clone());
        }
        let value = init();
        *cell.borrow_mut() = Entry::Set(value.clone());
        Ok(value)
    }
}

impl<T: 'static> Default for AssociationStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Clone for AssociationStore<T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            data: Rc::clone(&self.data),
        }
    }
}

impl<T: 'static> fmt::Display for AssociationStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[object WeakMap]")
    }
}

impl<T: 'static> fmt::Debug for AssociationStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssociationStore")
            .field("collection", &self.collection)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn primitives() -> Vec<Value> {
        vec![
            Value::Undefined,
            Value::Null,
            Value::from(true),
            Value::from(42),
            Value::from("key"),
        ]
    }

    #[test]
    fn set_get_has_delete() {
        let store = AssociationStore::<i32>::new();
        let key = ObjectRef::new();

        assert_eq!(store.get(&key), Ok(None));
        assert_eq!(store.has(&key), Ok(false));

        store.set(&key, 7).unwrap();
        assert_eq!(store.get(&key), Ok(Some(7)));
        assert_eq!(store.has(&key), Ok(true));

        assert_eq!(store.delete(&key), Ok(true));
        assert_eq!(store.get(&key), Ok(None));
        assert_eq!(store.delete(&key), Ok(false));
    }

    #[test]
    fn explicit_undefined_is_present() {
        let store = AssociationStore::<Value>::new();
        let key = Value::from(ObjectRef::new());

        store.set(&key, Value::Undefined).unwrap();
        assert_eq!(store.has(&key), Ok(true));
        assert_eq!(store.get(&key), Ok(Some(Value::Undefined)));
        assert_eq!(store.delete(&key), Ok(true));
        assert_eq!(store.delete(&key), Ok(false));
        assert_eq!(store.has(&key), Ok(false));
    }

    #[test]
    fn primitive_keys_are_rejected_by_every_operation() {
        let store = AssociationStore::<i32>::new();
        for key in primitives() {
            let invalid = CoreError::InvalidKey {
                found: key.type_name(),
            };
            assert_eq!(store.set(&key, 1), Err(invalid.clone()));
            assert_eq!(store.get(&key), Err(invalid.clone()));
            assert_eq!(store.has(&key), Err(invalid.clone()));
            assert_eq!(store.delete(&key), Err(invalid));
        }
    }

    #[test]
    fn function_keys_are_accepted() {
        let store = AssociationStore::new();
        let f = Value::from(ObjectRef::function(|_| Value::Null));
        store.set(&f, "meta".to_string()).unwrap();
        assert_eq!(store.get(&f), Ok(Some("meta".to_string())));
    }

    #[test]
    fn stores_are_isolated() {
        let a = AssociationStore::<i32>::new();
        let b = AssociationStore::<i32>::new();
        let key = ObjectRef::new();

        a.set(&key, 1).unwrap();
        assert_eq!(b.get(&key), Ok(None));
        b.set(&key, 2).unwrap();
        assert_eq!(a.get(&key), Ok(Some(1)));
        a.delete(&key).unwrap();
        assert_eq!(b.get(&key), Ok(Some(2)));
    }

    #[test]
    fn keys_are_compared_by_identity() {
        let store = AssociationStore::new();
        let a = ObjectRef::from_pairs([("x", Value::from(1))]);
        let b = ObjectRef::from_pairs([("x", Value::from(1))]);
        store.set(&a, "a").unwrap();
        assert_eq!(store.get(&b), Ok(None));
        assert_eq!(store.get(&a.clone()), Ok(Some("a")));
    }

    #[test]
    fn store_leaves_key_enumeration_untouched() {
        let store = AssociationStore::new();
        let key = ObjectRef::from_pairs([("a", Value::from(1)), ("b", Value::from(2))]);
        store.set(&key, ()).unwrap();
        assert_eq!(key.own_property_names(), vec!["a", "b"]);
        assert_eq!(key.keys(), vec!["a", "b"]);
    }

    #[test]
    fn wrap_twice_fails() {
        let collection = ObjectRef::new();
        let store = AssociationStore::<i32>::wrap(&collection, NamespacedLock::new()).unwrap();
        assert!(store.collection().ptr_eq(&collection));
        assert_eq!(
            AssociationStore::<i32>::wrap(&collection, NamespacedLock::new()).err(),
            Some(CoreError::AlreadyInitialized)
        );
        assert_eq!(
            AssociationStore::<i32>::wrap(store.collection(), NamespacedLock::new()).err(),
            Some(CoreError::AlreadyInitialized)
        );
    }

    #[test]
    fn from_collection_recovers_same_store() {
        let store = AssociationStore::new();
        let key = ObjectRef::new();
        store.set(&key, 5u8).unwrap();

        let again = AssociationStore::<u8>::from_collection(store.collection()).unwrap();
        assert_eq!(again.get(&key), Ok(Some(5)));
    }

    #[test]
    fn from_collection_rejects_plain_and_mistyped_objects() {
        assert_eq!(
            AssociationStore::<u8>::from_collection(&ObjectRef::new()).err(),
            Some(CoreError::NotInitialized)
        );
        let store = AssociationStore::<u8>::new();
        assert_eq!(
            AssociationStore::<String>::from_collection(store.collection()).err(),
            Some(CoreError::NotInitialized)
        );
    }

    #[test]
    fn from_entries_populates_and_validates() {
        let a = ObjectRef::new();
        let b = ObjectRef::new();
        let store =
            AssociationStore::from_entries([(Value::from(&a), 1), (Value::from(&b), 2)]).unwrap();
        assert_eq!(store.get(&a), Ok(Some(1)));
        assert_eq!(store.get(&b), Ok(Some(2)));

        let err = AssociationStore::from_entries([(Value::from(&a), 1), (Value::from(3), 2)]);
        assert_eq!(err.err(), Some(CoreError::InvalidKey { found: "number" }));
    }

    #[test]
    fn get_or_insert_with_runs_once() {
        let store = AssociationStore::new();
        let key = ObjectRef::new();
        let mut calls = 0;
        let first = store
            .get_or_insert_with(&key, || {
                calls += 1;
                10
            })
            .unwrap();
        let second = store.get_or_insert_with(&key, || 99).unwrap();
        assert_eq!((first, second, calls), (10, 10, 1));
    }

    #[test]
    fn non_extensible_key_is_rejected() {
        let store = AssociationStore::new();
        let key = ObjectRef::new();
        key.prevent_extensions();
        assert_eq!(store.set(&key, 1).err(), Some(CoreError::NotExtensible));
    }

    #[test]
    fn dropping_key_releases_value() {
        let store = AssociationStore::new();
        let payload = Rc::new(vec![1u8; 64]);
        let watch = Rc::downgrade(&payload);

        let key = ObjectRef::new();
        let key_watch = key.downgrade();
        store.set(&key, payload).unwrap();
        assert!(watch.upgrade().is_some());

        drop(key);
        assert!(!key_watch.is_alive());
        assert!(watch.upgrade().is_none());
    }

    #[test]
    fn new_store_is_registered_on_its_collection() {
        let store = AssociationStore::<u8>::new();
        let again = AssociationStore::<u8>::from_collection(store.collection()).unwrap();
        let key = ObjectRef::new();
        again.set(&key, 3).unwrap();
        assert_eq!(store.get(&key), Ok(Some(3)));
        assert_eq!(
            AssociationStore::wrap(store.collection(), NamespacedLock::<u8>::new()).err(),
            Some(CoreError::AlreadyInitialized)
        );
    }

    #[test]
    fn value_referring_to_its_key_keeps_key_alive() {
        let store = AssociationStore::new();
        let key = ObjectRef::new();
        let key_watch = key.downgrade();
        store.set(&key, Value::from(&key)).unwrap();

        drop(key);
        assert!(key_watch.is_alive());

        let leaked = key_watch.upgrade().unwrap();
        assert!(store.delete(&leaked).unwrap());
        drop(leaked);
        assert!(!key_watch.is_alive());
    }

    #[test]
    fn weak_back_reference_does_not_keep_key_alive() {
        let store = AssociationStore::new();
        let key = ObjectRef::new();
        let key_watch = key.downgrade();
        store.set(&key, key.downgrade()).unwrap();

        let back = store.get(&key).unwrap().and_then(|weak| weak.upgrade());
        assert!(back.is_some_and(|obj| obj.ptr_eq(&key)));

        drop(key);
        assert!(!key_watch.is_alive());
    }

    #[test]
    fn display_matches_host_tag() {
        assert_eq!(AssociationStore::<()>::new().to_string(), "[object WeakMap]");
    }
}

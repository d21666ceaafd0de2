#![forbid(unsafe_code)]

//! Core: host object model and hidden, identity-keyed association stores.
//!
//! Values attached through an [`AssociationStore`] live on the key object
//! itself, in a hidden slot that reflection never reports, behind a
//! per-store secret. A key that becomes unreachable takes its associated
//! data with it.
//!
//! # Example
//!
//! ```
//! use ktrack_core::{AssociationStore, ObjectRef, Value};
//!
//! let store = AssociationStore::new();
//! let key = ObjectRef::from_pairs([("name", Value::from("ada"))]);
//!
//! store.set(&key, 42).unwrap();
//! assert_eq!(store.get(&key).unwrap(), Some(42));
//! assert_eq!(key.keys(), vec!["name"]);
//! ```

pub mod error;
pub mod lock;
pub mod object;
mod slot;
pub mod token;
pub mod value;
pub mod weak_map;

pub use error::{CoreError, Result};
pub use lock::{DataCell, Entry, NamespacedLock};
pub use object::{Descriptor, ObjectRef, Property, PropertyKind, WeakObjectRef};
pub use value::Value;
pub use weak_map::{AssociationKey, AssociationStore};

#![forbid(unsafe_code)]

//! Observable property tracking for host objects.
//!
//! [`attach`] wraps an [`ObservableFactory`] in a [`PropertyTracker`]. Tracking
//! an object replaces its fields with accessors backed by observable handles
//! and records each handle in a per-object registry that is invisible to the
//! object's own reflection and does not keep the object alive.
//!
//! # Example
//!
//! ```
//! use ktrack::{ObservableHandle, ObjectRef, Reactive, Value};
//!
//! let ko = ktrack::attach(Reactive);
//! let model = ObjectRef::from_pairs([("count", Value::from(0))]);
//! let target = Value::from(&model);
//!
//! ko.track(&target).unwrap();
//! model.set("count", Value::from(1));
//!
//! let count = ko.get_observable(&target, "count").unwrap();
//! assert_eq!(count.read(), Value::from(1));
//! assert_eq!(model.keys(), vec!["count"]);
//! ```

pub mod config;
pub mod error;
pub mod handle;
pub mod registry;
pub mod tracker;

pub use config::{FieldSelection, TrackerConfig};
pub use error::{Result, TrackError};
pub use handle::{ObservableFactory, ObservableHandle, Reactive};
pub use registry::{FieldMap, ObservableRegistry};
pub use tracker::{PropertyTracker, attach, attach_with_config};

pub use ktrack_core::{
    AssociationStore, CoreError, Descriptor, ObjectRef, Property, PropertyKind, Value,
};
pub use ktrack_reactive::{Observable, Subscription};

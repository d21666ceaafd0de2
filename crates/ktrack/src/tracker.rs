#![forbid(unsafe_code)]

//! Convert plain fields into observable accessor fields.
//!
//! # Design
//!
//! [`PropertyTracker`] owns the host (an [`ObservableFactory`]), its
//! [`ObservableRegistry`] and a [`TrackerConfig`]. `track` replaces each
//! selected field with an accessor pair that forwards reads and writes to a
//! freshly created handle, and records that handle in the registry.
//!
//! # Invariants
//!
//! 1. Right after `track`, `get_observable` on the same field returns the
//!    handle just installed.
//! 2. Re-tracking a field installs a new handle seeded with the field's
//!    current value; the previous handle is dropped from the registry.
//! 3. The registry entry for an object is created with its first tracked
//!    field, before any field is touched, so an object that cannot take it
//!    is left unchanged. An empty field list touches nothing.
//!
//! # Failure Modes
//!
//! - **Primitive target**: `track` fails with [`TrackError::InvalidTarget`];
//!   `get_observable` returns `None`; `notify_mutated` does nothing.
//! - **Non-configurable field**: `track` fails on that field with
//!   [`CoreError::NotConfigurable`](ktrack_core::CoreError::NotConfigurable).
//!   Fields earlier in the list stay converted.

use std::ops::Deref;

use ktrack_core::{ObjectRef, Property, Value};

use crate::config::{FieldSelection, TrackerConfig};
use crate::error::{Result, TrackError};
use crate::handle::{ObservableFactory, ObservableHandle};
use crate::registry::ObservableRegistry;

/// Attach tracking capabilities to `host` with the default configuration.
#[must_use]
pub fn attach<F: ObservableFactory>(host: F) -> PropertyTracker<F> {
    PropertyTracker::new(host, TrackerConfig::default())
}

/// Attach tracking capabilities to `host`.
#[must_use]
pub fn attach_with_config<F: ObservableFactory>(host: F, config: TrackerConfig) -> PropertyTracker<F> {
    PropertyTracker::new(host, config)
}

/// Tracks fields of host objects through observable handles.
///
/// Dereferences to the host, so the host's own API stays reachable.
pub struct PropertyTracker<F: ObservableFactory> {
    host: F,
    registry: ObservableRegistry<F::Handle>,
    config: TrackerConfig,
}

impl<F: ObservableFactory> PropertyTracker<F> {
    #[must_use]
    pub fn new(host: F, config: TrackerConfig) -> Self {
        Self {
            host,
            registry: ObservableRegistry::new(),
            config,
        }
    }

    /// Track the fields selected by [`TrackerConfig::field_selection`],
    /// snapshotted at call time. Returns the target object for chaining.
    pub fn track(&self, target: &Value) -> Result<ObjectRef> {
        let obj = Self::target(target)?;
        let names = match self.config.field_selection {
            FieldSelection::Enumerable => obj.keys(),
            FieldSelection::AllOwn => obj.own_property_names(),
        };
        self.track_names(obj, &names)
    }

    /// Track exactly `fields`. Names that do not exist yet are created,
    /// starting out undefined.
    pub fn track_fields<S: AsRef<str>>(&self, target: &Value, fields: &[S]) -> Result<ObjectRef> {
        let obj = Self::target(target)?;
        self.track_names(obj, fields)
    }

    /// The handle backing `name` on `target`, if that field is tracked.
    #[must_use]
    pub fn get_observable(&self, target: &Value, name: &str) -> Option<F::Handle> {
        self.registry.lookup(target.as_object()?, name)
    }

    /// Tell the handle behind `name` that its value changed in place.
    /// Untracked fields and primitive targets are ignored.
    pub fn notify_mutated(&self, target: &Value, name: &str) {
        if let Some(handle) = self.get_observable(target, name) {
            handle.value_has_mutated();
        }
    }

    #[must_use]
    pub fn registry(&self) -> &ObservableRegistry<F::Handle> {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    #[must_use]
    pub fn host(&self) -> &F {
        &self.host
    }

    fn target(target: &Value) -> Result<&ObjectRef> {
        target.as_object().ok_or(TrackError::InvalidTarget {
            found: target.type_name(),
        })
    }

    fn track_names<S: AsRef<str>>(&self, obj: &ObjectRef, names: &[S]) -> Result<ObjectRef> {
        if names.is_empty() {
            return Ok(obj.clone());
        }
        self.registry.fields_or_insert(obj)?;

        for name in names {
            let name = name.as_ref();
            let handle = self.host.observable(obj.get(name));
            let (reader, writer) = (handle.clone(), handle.clone());
            let accessor = Property::accessor(move || reader.read(), move |value| writer.write(value))
                .with_enumerable(self.config.accessor_enumerable)
                .with_configurable(self.config.accessor_configurable);
            obj.define_property(name, accessor)?;

            let previous = self.registry.register(obj, name, handle)?;
            if previous.is_some() {
                tracing::debug!(message = "track.replace", object = obj.id(), field = name);
            } else {
                tracing::trace!(message = "track.field", object = obj.id(), field = name);
            }
        }

        Ok(obj.clone())
    }
}

impl<F: ObservableFactory> Deref for PropertyTracker<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.host
    }
}

impl<F: ObservableFactory + std::fmt::Debug> std::fmt::Debug for PropertyTracker<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyTracker")
            .field("host", &self.host)
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

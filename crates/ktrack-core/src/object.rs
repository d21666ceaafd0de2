#![forbid(unsafe_code)]

//! Single-threaded host objects with reflective property access.
//!
//! An [`ObjectRef`] is a shared handle to a property table. Properties are
//! kept in insertion order and are either plain data, accessor pairs, or the
//! crate-internal hidden store that backs association stores.
//!
//! # Invariants
//!
//! 1. No interior borrow is held while a getter, setter or native function
//!    runs, so callbacks may re-enter the object.
//! 2. Non-configurable properties can be neither redefined nor deleted.
//! 3. A non-extensible object never gains a new property.
//! 4. The hidden store name never appears in [`ObjectRef::own_property_names`],
//!    [`ObjectRef::keys`], [`ObjectRef::descriptor`] or serialized output.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::error::{CoreError, Result};
use crate::slot::{self, PerObjectStore};
use crate::value::Value;

pub type Getter = Rc<dyn Fn() -> Value>;
pub type Setter = Rc<dyn Fn(Value)>;
pub type NativeFn = Rc<dyn Fn(&[Value]) -> Value>;

static NEXT_OBJECT_ID: AtomicU64 = AtomicU64::new(1);

fn next_object_id() -> u64 {
    NEXT_OBJECT_ID.fetch_add(1, Ordering::Relaxed)
}

#[derive(Clone)]
enum Payload {
    Data { value: Value, writable: bool },
    Accessor {
        get: Option<Getter>,
        set: Option<Setter>,
    },
    Hidden(Rc<RefCell<PerObjectStore>>),
}

/// A property definition accepted by [`ObjectRef::define_property`].
#[derive(Clone)]
pub struct Property {
    payload: Payload,
    enumerable: bool,
    configurable: bool,
}

impl Property {
    /// A writable, enumerable, configurable data property.
    #[must_use]
    pub fn data(value: impl Into<Value>) -> Self {
        Self {
            payload: Payload::Data {
                value: value.into(),
                writable: true,
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// An enumerable, configurable accessor property.
    #[must_use]
    pub fn accessor(
        get: impl Fn() -> Value + 'static,
        set: impl Fn(Value) + 'static,
    ) -> Self {
        Self {
            payload: Payload::Accessor {
                get: Some(Rc::new(get)),
                set: Some(Rc::new(set)),
            },
            enumerable: true,
            configurable: true,
        }
    }

    /// An accessor property without a setter; assignments are refused.
    #[must_use]
    pub fn getter(get: impl Fn() -> Value + 'static) -> Self {
        Self {
            payload: Payload::Accessor {
                get: Some(Rc::new(get)),
                set: None,
            },
            enumerable: true,
            configurable: true,
        }
    }

    pub(crate) fn hidden(store: Rc<RefCell<PerObjectStore>>) -> Self {
        Self {
            payload: Payload::Hidden(store),
            enumerable: false,
            configurable: false,
        }
    }

    #[must_use]
    pub fn with_enumerable(mut self, enumerable: bool) -> Self {
        self.enumerable = enumerable;
        self
    }

    #[must_use]
    pub fn with_configurable(mut self, configurable: bool) -> Self {
        self.configurable = configurable;
        self
    }

    /// Set writability. Ignored for accessor properties.
    #[must_use]
    pub fn with_writable(mut self, writable: bool) -> Self {
        if let Payload::Data { writable: w, .. } = &mut self.payload {
            *w = writable;
        }
        self
    }
}

/// Shape of an own property as reported by [`ObjectRef::descriptor`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
    Data,
    Accessor,
}

/// Reflective summary of an own property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor {
    pub kind: PropertyKind,
    pub enumerable: bool,
    pub configurable: bool,
    /// Always false for accessors.
    pub writable: bool,
}

struct ObjectData {
    id: u64,
    order: Vec<Rc<str>>,
    props: AHashMap<Rc<str>, Property>,
    extensible: bool,
    call: Option<NativeFn>,
}

impl ObjectData {
    fn new(call: Option<NativeFn>) -> Self {
        Self {
            id: next_object_id(),
            order: Vec::new(),
            props: AHashMap::new(),
            extensible: true,
            call,
        }
    }

    fn insert(&mut self, name: &str, property: Property) {
        let name: Rc<str> = Rc::from(name);
        self.order.push(Rc::clone(&name));
        self.props.insert(name, property);
    }
}

/// Shared handle to a host object. Cloning yields the same object.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<ObjectData>>);

/// Non-owning handle, used to observe when an object has been reclaimed.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RefCell<ObjectData>>);

impl WeakObjectRef {
    #[must_use]
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl ObjectRef {
    /// Create an empty, extensible object.
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(ObjectData::new(None))))
    }

    /// Create a function-like object.
    #[must_use]
    pub fn function(call: impl Fn(&[Value]) -> Value + 'static) -> Self {
        Self(Rc::new(RefCell::new(ObjectData::new(Some(Rc::new(call))))))
    }

    /// Create an object with plain data properties, in order.
    #[must_use]
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        let obj = Self::new();
        {
            let mut data = obj.0.borrow_mut();
            for (name, value) in pairs {
                if let Some(existing) = data.props.get_mut(name) {
                    *existing = Property::data(value);
                } else {
                    data.insert(name, Property::data(value));
                }
            }
        }
        obj
    }

    /// Process-unique object number, for diagnostics.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.0.borrow().id
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    #[must_use]
    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    #[must_use]
    pub fn is_callable(&self) -> bool {
        self.0.borrow().call.is_some()
    }

    /// Invoke a function-like object.
    pub fn call(&self, args: &[Value]) -> Result<Value> {
        let call = self.0.borrow().call.clone().ok_or(CoreError::NotCallable)?;
        Ok(call(args))
    }

    /// Read a property, running its getter if it is an accessor.
    /// Missing properties read as [`Value::Undefined`].
    #[must_use]
    pub fn get(&self, name: &str) -> Value {
        let getter = {
            let data = self.0.borrow();
            match data.props.get(name).map(|p| &p.payload) {
                Some(Payload::Data { value, .. }) => return value.clone(),
                Some(Payload::Accessor { get, .. }) => get.clone(),
                Some(Payload::Hidden(_)) | None => None,
            }
        };
        getter.map_or(Value::Undefined, |get| get())
    }

    /// Assign a property. Returns whether the assignment took effect.
    ///
    /// Missing properties are created as plain data when the object is
    /// extensible; read-only data and setter-less accessors refuse.
    pub fn set(&self, name: &str, value: Value) -> bool {
        let setter = {
            let mut data = self.0.borrow_mut();
            if !data.props.contains_key(name) {
                if !data.extensible {
                    return false;
                }
                data.insert(name, Property::data(value));
                return true;
            }
            match data.props.get_mut(name).map(|p| &mut p.payload) {
                Some(Payload::Data {
                    value: current,
                    writable,
                }) => {
                    if !*writable {
                        return false;
                    }
                    *current = value;
                    return true;
                }
                Some(Payload::Accessor { set, .. }) => set.clone(),
                Some(Payload::Hidden(_)) | None => None,
            }
        };
        match setter {
            Some(set) => {
                set(value);
                true
            }
            None => false,
        }
    }

    /// Create or replace an own property.
    pub fn define_property(&self, name: &str, property: Property) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if let Some(existing) = data.props.get_mut(name) {
            if !existing.configurable {
                return Err(CoreError::not_configurable(name));
            }
            *existing = property;
            return Ok(());
        }
        if !data.extensible {
            return Err(CoreError::NotExtensible);
        }
        data.insert(name, property);
        Ok(())
    }

    /// Remove an own property. Returns false for non-configurable ones.
    pub fn delete_property(&self, name: &str) -> bool {
        let mut data = self.0.borrow_mut();
        let configurable = match data.props.get(name) {
            None => return true,
            Some(p) => p.configurable,
        };
        if !configurable {
            return false;
        }
        data.props.remove(name);
        data.order.retain(|n| &**n != name);
        true
    }

    #[must_use]
    pub fn has_own_property(&self, name: &str) -> bool {
        !slot::is_hidden_name(name) && self.0.borrow().props.contains_key(name)
    }

    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<Descriptor> {
        if slot::is_hidden_name(name) {
            return None;
        }
        let data = self.0.borrow();
        let property = data.props.get(name)?;
        let (kind, writable) = match &property.payload {
            Payload::Data { writable, .. } => (PropertyKind::Data, *writable),
            Payload::Accessor { .. } => (PropertyKind::Accessor, false),
            Payload::Hidden(_) => return None,
        };
        Some(Descriptor {
            kind,
            enumerable: property.enumerable,
            configurable: property.configurable,
            writable,
        })
    }

    #[must_use]
    pub fn is_extensible(&self) -> bool {
        self.0.borrow().extensible
    }

    /// Refuse any further new properties. Irreversible.
    pub fn prevent_extensions(&self) {
        self.0.borrow_mut().extensible = false;
    }

    /// Make every property read-only and non-configurable, then prevent
    /// extensions.
    pub fn freeze(&self) {
        let mut data = self.0.borrow_mut();
        for property in data.props.values_mut() {
            property.configurable = false;
            if let Payload::Data { writable, .. } = &mut property.payload {
                *writable = false;
            }
        }
        data.extensible = false;
    }

    /// Own property names in insertion order, enumerable or not.
    #[must_use]
    pub fn own_property_names(&self) -> Vec<String> {
        slot::exclude_hidden(self.raw_own_property_names())
    }

    /// Own enumerable property names in insertion order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let names = {
            let data = self.0.borrow();
            data.order
                .iter()
                .filter(|name| data.props.get(&**name).is_some_and(|p| p.enumerable))
                .map(|name| name.to_string())
                .collect()
        };
        slot::exclude_hidden(names)
    }

    /// Copy every enumerable own property of `source` onto `self` by
    /// assignment. Returns how many assignments took effect.
    pub fn assign_from(&self, source: &ObjectRef) -> usize {
        source
            .keys()
            .into_iter()
            .filter(|name| self.set(name, source.get(name)))
            .count()
    }

    /// The unguarded enumeration primitive.
    pub(crate) fn raw_own_property_names(&self) -> Vec<String> {
        self.0
            .borrow()
            .order
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    pub(crate) fn hidden_store(&self, name: &str) -> Option<Rc<RefCell<PerObjectStore>>> {
        match self.0.borrow().props.get(name).map(|p| &p.payload) {
            Some(Payload::Hidden(store)) => Some(Rc::clone(store)),
            _ => None,
        }
    }

    /// Attach a hidden store under `name`. Never overwrites an existing
    /// property of that name.
    pub(crate) fn attach_hidden_store(
        &self,
        name: &str,
        store: Rc<RefCell<PerObjectStore>>,
    ) -> Result<()> {
        let mut data = self.0.borrow_mut();
        if data.props.contains_key(name) {
            return Err(CoreError::not_configurable(name));
        }
        if !data.extensible {
            return Err(CoreError::NotExtensible);
        }
        data.insert(name, Property::hidden(store));
        Ok(())
    }
}

impl Default for ObjectRef {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ObjectRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ObjectRef {}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(data) if data.call.is_some() => write!(f, "Function#{}", data.id),
            Ok(data) => write!(f, "Object#{}", data.id),
            Err(_) => f.write_str("Object#<borrowed>"),
        }
    }
}

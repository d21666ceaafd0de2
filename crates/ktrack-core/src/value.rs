#![forbid(unsafe_code)]

//! Dynamically typed values of the host object model.
//!
//! [`Value::Object`] is the only reference type. Everything else is a
//! primitive and compares by value; objects compare by identity.

use std::fmt;
use std::rc::Rc;

use crate::object::ObjectRef;

/// A host value.
#[derive(Clone, Default)]
pub enum Value {
    /// Absence of a value.
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    /// An object or a function-like object.
    Object(ObjectRef),
}

impl Value {
    /// Short type label used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Object(obj) if obj.is_callable() => "function",
            Self::Object(_) => "object",
        }
    }

    /// Whether this value carries identity (object or function).
    #[must_use]
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Object(_))
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Number(a), Self::Number(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => f.write_str("undefined"),
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Object(obj) => write!(f, "{obj:?}"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(Rc::from(value))
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        Self::Object(value)
    }
}

impl From<&ObjectRef> for Value {
    fn from(value: &ObjectRef) -> Self {
        Self::Object(value.clone())
    }
}

#[cfg(feature = "serde")]
mod ser {
    use serde::ser::{Error, Serialize, SerializeMap, Serializer};

    use super::Value;

    /// Nesting limit; deeper graphs are treated as cyclic.
    const MAX_DEPTH: usize = 64;

    struct Nested<'a> {
        value: &'a Value,
        depth: usize,
    }

    impl Serialize for Value {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            Nested {
                value: self,
                depth: 0,
            }
            .serialize(serializer)
        }
    }

    impl Serialize for Nested<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            match self.value {
                Value::Undefined | Value::Null => serializer.serialize_unit(),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
                Value::Number(_) => serializer.serialize_unit(),
                Value::String(s) => serializer.serialize_str(s),
                Value::Object(obj) if obj.is_callable() => serializer.serialize_unit(),
                Value::Object(obj) => {
                    if self.depth >= MAX_DEPTH {
                        return Err(S::Error::custom("cyclic object value"));
                    }
                    // Read everything first: getters may re-enter the object.
                    let entries: Vec<(String, Value)> = obj
                        .keys()
                        .into_iter()
                        .map(|name| {
                            let value = obj.get(&name);
                            (name, value)
                        })
                        .filter(|(_, value)| !value.is_undefined())
                        .collect();

                    let mut map = serializer.serialize_map(Some(entries.len()))?;
                    for (name, value) in &entries {
                        map.serialize_entry(
                            name,
                            &Nested {
                                value,
                                depth: self.depth + 1,
                            },
                        )?;
                    }
                    map.end()
                }
            }
        }
    }
}

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

/// Misuse of the object model or of an association store.
///
/// Every variant is raised synchronously at the point of misuse and before
/// any mutation takes place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// A primitive was used where an object or function key is required.
    #[error("invalid association key: expected an object or function, got {found}")]
    InvalidKey { found: &'static str },

    /// The object refuses new properties.
    #[error("object must be extensible")]
    NotExtensible,

    /// `wrap` ran twice on the same collection object.
    #[error("object is already an association store")]
    AlreadyInitialized,

    /// The collection object was never wrapped, or was wrapped for another
    /// value type.
    #[error("association store is not generic")]
    NotInitialized,

    #[error("property `{name}` is not configurable")]
    NotConfigurable { name: String },

    #[error("value is not callable")]
    NotCallable,
}

impl CoreError {
    #[must_use]
    pub fn not_configurable(name: impl Into<String>) -> Self {
        Self::NotConfigurable { name: name.into() }
    }
}

use ktrack_core::CoreError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, TrackError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    /// `track` was handed a primitive instead of an object.
    #[error("track requires an object as its target, got {found}")]
    InvalidTarget { found: &'static str },

    #[error(transparent)]
    Core(#[from] CoreError),
}

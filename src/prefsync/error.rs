use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by the preference layer.
///
/// The enum is `Clone` so a failure can be recorded in a coordinator's
/// [`SaveState`](crate::debounce::SaveState) and handed to callers at the same
/// time. Wrapped foreign errors are shared through `Arc` for that reason.
#[derive(Error, Debug, Clone)]
pub enum PrefsError {
    #[error("Failed to load preferences: {0}")]
    Load(String),

    #[error("Failed to save preferences: {0}")]
    Save(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Serialization error: {0}")]
    Serialization(Arc<serde_json::Error>),

    #[error("Invalid filter expression: {0:?}")]
    InvalidFilter(String),

    #[error("Invalid color: {0:?} (expected #rgb or #rrggbb)")]
    InvalidColor(String),

    #[error("Unknown column: {0}")]
    UnknownColumn(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Preference sync has been shut down")]
    Closed,
}

impl From<std::io::Error> for PrefsError {
    fn from(err: std::io::Error) -> Self {
        PrefsError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for PrefsError {
    fn from(err: serde_json::Error) -> Self {
        PrefsError::Serialization(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, PrefsError>;

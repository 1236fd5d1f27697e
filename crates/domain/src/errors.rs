//! Error types used throughout the upload queue

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for sitecap
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum SitecapError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for sitecap operations
pub type Result<T> = std::result::Result<T, SitecapError>;

/// Failure reported by an upload callback.
///
/// The queue records the rendered message on the item and never inspects the
/// variant; every variant counts as one failed attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum UploadError {
    /// Transport-level failure (DNS, connect, timeout).
    #[error("network failure: {0}")]
    Network(String),

    /// The remote service answered but refused the payload.
    #[error("upload rejected: {0}")]
    Rejected(String),

    /// The local file referenced by the item could not be read.
    #[error("local file unavailable: {0}")]
    LocalFile(String),

    #[error("{0}")]
    Other(String),
}

impl UploadError {
    /// Shorthand for [`UploadError::Other`].
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<String> for UploadError {
    fn from(message: String) -> Self {
        Self::Other(message)
    }
}

impl From<&str> for UploadError {
    fn from(message: &str) -> Self {
        Self::Other(message.to_string())
    }
}

//! Error types for object storage.

use thiserror::Error;

/// Error that can occur in object storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Client could not be configured (e.g. credentials missing)
    #[error("storage configuration error: {0}")]
    Config(String),

    /// No object under the key
    #[error("object not found: {0}")]
    NotFound(String),

    /// The storage service rejected or failed the request
    #[error("{operation} '{key}' failed: {message}")]
    Request {
        operation: &'static str,
        key: String,
        message: String,
    },
}

impl StorageError {
    /// Create a request error.
    pub fn request(operation: &'static str, key: &str, error: impl std::fmt::Display) -> Self {
        Self::Request {
            operation,
            key: key.to_string(),
            message: error.to_string(),
        }
    }
}

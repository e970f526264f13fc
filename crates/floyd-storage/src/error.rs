//! Session Store error types.

use thiserror::Error;

/// Errors from session storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// No session exists with the given id.
    #[error("no session with id {0}")]
    NotFound(String),

    /// A filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The on-disk record could not be parsed as a session.
    #[error("corrupt session record: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for session storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

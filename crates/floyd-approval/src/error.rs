//! Permission Manager error types.

use thiserror::Error;

/// Errors from the Permission Manager.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// The glob pattern in a rule could not be compiled.
    #[error("invalid permission pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// The underlying glob-compilation error.
        #[source]
        source: globset::Error,
    },

    /// Persisting an `always`-scope grant/deny failed.
    #[error("could not persist permission rule: {0}")]
    Persist(#[from] floyd_config::ConfigError),
}

/// Result type for Permission Manager operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

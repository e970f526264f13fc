//! Agent Engine error types.

use thiserror::Error;

/// Errors that can prevent a turn from running at all (construction-time,
/// or a precondition violated at `send_message` time). Mid-turn failures
/// that the loop recovers from locally (tool-parse errors, permission
/// denials, transport retries) never reach this type — they surface as
/// [`crate::EngineEvent`] variants instead, per §7's propagation policy.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A turn was already in progress on this engine instance (§9 "one
    /// active session per engine at a time").
    #[error("a turn is already in progress on this engine")]
    TurnInProgress,

    /// The caller sent a zero-length user message.
    #[error("a user message must not be empty")]
    EmptyMessage,

    /// Persisting the session failed.
    #[error("session storage error: {0}")]
    Storage(#[from] floyd_storage::StorageError),

    /// The Permission Manager could not be consulted (e.g. a rule file
    /// failed to persist a grant).
    #[error("permission manager error: {0}")]
    Approval(#[from] floyd_approval::ApprovalError),
}

/// Result type for fatal, pre-turn Agent Engine failures.
pub type EngineResult<T> = Result<T, EngineError>;

//! The cooperative cancel token shared by `floyd-llm` and `floyd-runtime`.
//!
//! A single [`CancelToken`] is threaded through one turn: the Agent Engine
//! owns the firing half, the LLM Client and MCP dispatch observe it at their
//! suspension points. Firing is idempotent and cheap to check repeatedly —
//! see §5 "Cancellation" in the specification.

use tokio_util::sync::CancellationToken;

/// A cooperative, idempotent cancellation signal for one turn.
///
/// Cloning shares the same underlying signal; firing any clone fires all of
/// them. Checking [`CancelToken::is_cancelled`] never blocks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(CancellationToken);

impl CancelToken {
    /// A fresh, unfired token.
    #[must_use]
    pub fn new() -> Self {
        Self(CancellationToken::new())
    }

    /// Fire the token. Safe to call more than once.
    pub fn cancel(&self) {
        self.0.cancel();
    }

    /// True once `cancel` has been called on this token or any of its clones.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves the first time this token fires. Used in `tokio::select!`
    /// alongside a stream read or an I/O await to observe cancellation at a
    /// suspension point without polling.
    pub async fn cancelled(&self) {
        self.0.cancelled().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_token_is_not_cancelled() {
        assert!(!CancelToken::new().is_cancelled());
    }

    #[test]
    fn cancelling_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn clones_share_the_same_signal() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
    }
}

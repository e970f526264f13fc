//! Error types for MCP transports and the client manager.

use thiserror::Error;

/// Transport-level failures, shared by all three transport flavors.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The connection closed (child exited, socket dropped) before a
    /// pending request was answered.
    #[error("transport closed unexpectedly")]
    Closed,
    /// No response arrived within the configured timeout.
    #[error("timed out waiting for a response")]
    Timeout,
    /// An I/O or protocol framing error.
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// Errors surfaced by [`crate::manager::McpClientManager`].
#[derive(Debug, Error)]
pub enum McpError {
    /// The underlying transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// The named server was never connected.
    #[error("no server named {0:?} is configured")]
    UnknownServer(String),
    /// A tool's owning server disconnected between listing and calling.
    #[error("tool {0:?} is no longer available")]
    ToolUnavailable(String),
    /// Spawning a stdio server's child process failed.
    #[error("failed to spawn server {0:?}: {1}")]
    Spawn(String, std::io::Error),
    /// The server sent a response that did not match the expected shape.
    #[error("server {0:?} returned a malformed response")]
    Protocol(String),
}

/// Result type for MCP operations.
pub type McpResult<T> = Result<T, McpError>;

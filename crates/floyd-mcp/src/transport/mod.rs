//! The three MCP transport flavors: stdio client, WebSocket client, WebSocket server.

mod stdio;
mod ws_client;
mod ws_server;

pub use stdio::StdioTransport;
pub use ws_client::WsClientTransport;
pub use ws_server::{serve, LocalToolFacade};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::TransportError;

/// The default per-request timeout (§5): every `call()` on every client
/// transport gives up and fails with [`TransportError::Timeout`] if no
/// response arrives within this long.
pub const DEFAULT_REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);

/// A connected MCP transport from the client's point of view.
///
/// Implementors own the request-id counter and the pending-response map;
/// `call` resolves when the matching response frame arrives, fails the
/// request, or the connection closes.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Send a request and await its response.
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError>;

    /// Send a fire-and-forget notification.
    async fn notify(&self, method: &str, params: Value) -> Result<(), TransportError>;

    /// Close the connection, failing any still-pending requests with
    /// [`TransportError::Closed`].
    async fn close(&self);
}

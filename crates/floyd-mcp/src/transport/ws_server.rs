//! WebSocket server transport: the inbound side of the MCP protocol.
//!
//! Serves a fixed method set (`initialize`, `tools/list`, `tools/call`,
//! `agent/status`) by delegating to a [`LocalToolFacade`] implementation —
//! the server never reaches into the Agent Engine's private state.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;

use crate::rpc::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};

/// The minimal surface the WebSocket server needs from a tool registry.
#[async_trait]
pub trait LocalToolFacade: Send + Sync {
    /// List the currently available tools as `{name, description, input_schema}`.
    async fn list_tools(&self) -> Vec<Value>;

    /// Invoke `name` with `args`, returning the tool's result or an error string.
    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, String>;

    /// A small status payload for the `agent/status` method.
    async fn status(&self) -> Value;
}

/// Listen on `addr` and serve `facade` to any number of concurrent connections.
///
/// Runs until the listener itself fails to bind; each accepted connection
/// is handled on its own task and a peer disconnecting does not affect
/// others.
///
/// # Errors
/// Returns an I/O error if `addr` cannot be bound.
pub async fn serve(addr: &str, facade: std::sync::Arc<dyn LocalToolFacade>) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    loop {
        let (stream, _peer) = listener.accept().await?;
        let facade = facade.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, facade).await {
                tracing::warn!(%err, "mcp websocket connection ended");
            }
        });
    }
}

async fn handle_connection(
    stream: TcpStream,
    facade: std::sync::Arc<dyn LocalToolFacade>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let ws = tokio_tungstenite::accept_async(stream).await?;
    let (mut sink, mut stream) = ws.split();

    while let Some(message) = stream.next().await {
        let message = message?;
        let Message::Text(text) = message else {
            if matches!(message, Message::Close(_)) {
                break;
            }
            continue;
        };

        let response = match serde_json::from_str::<JsonRpcRequest>(&text) {
            Ok(request) => handle_request(&facade, request).await,
            Err(err) => Some(JsonRpcResponse::failure(None, JsonRpcError::parse_error(&err.to_string()))),
        };

        if let Some(response) = response {
            let text = serde_json::to_string(&response)?;
            sink.send(Message::Text(text)).await?;
        }
    }

    Ok(())
}

/// Dispatch one request; returns `None` for a notification (no response owed).
async fn handle_request(
    facade: &std::sync::Arc<dyn LocalToolFacade>,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    let Some(id) = request.id else { return None };

    let result = match request.method.as_str() {
        "initialize" => Ok(serde_json::json!({
            "capabilities": { "tools": facade.list_tools().await }
        })),
        "tools/list" => Ok(serde_json::json!({"tools": facade.list_tools().await})),
        "tools/call" => {
            let params = request.params.unwrap_or(Value::Null);
            let name = params.get("name").and_then(Value::as_str).unwrap_or_default().to_string();
            let args = params.get("arguments").cloned().unwrap_or(Value::Null);
            match facade.call_tool(&name, args).await {
                Ok(value) => Ok(value),
                Err(message) => Err(JsonRpcError {
                    code: JsonRpcError::INTERNAL_ERROR,
                    message,
                    data: None,
                }),
            }
        }
        "agent/status" => Ok(facade.status().await),
        other => Err(JsonRpcError::method_not_found(other)),
    };

    Some(match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(error) => JsonRpcResponse::failure(Some(id), error),
    })
}

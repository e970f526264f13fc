//! Floyd MCP — the MCP Client Manager and the three transport flavors.
//!
//! [`McpClientManager`] owns a named set of connected servers and exposes a
//! single aggregated, collision-resolved tool catalogue plus a `call_tool`
//! dispatch entry point. [`transport`] carries the wire-level plumbing
//! (stdio subprocess, WebSocket client, WebSocket server) behind the shared
//! [`McpTransport`] trait so the manager never cares which one it's holding.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod manager;
pub mod rpc;
pub mod transport;

pub use error::{McpError, McpResult, TransportError};
pub use manager::{ConnectSummary, McpClientManager, ToolCollision};
pub use rpc::{JsonRpcRequest, JsonRpcResponse, JsonRpcError};
pub use transport::{serve, LocalToolFacade, McpTransport, StdioTransport, WsClientTransport};

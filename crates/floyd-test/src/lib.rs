//! Shared test fixtures for the Floyd agent runtime.
//!
//! Two scriptable stand-ins let the integration suite drive the Agent
//! Engine without a real provider or a real MCP server:
//!
//! - [`ScriptedLlm`] implements `floyd_llm::LlmClient` by replaying a
//!   pre-recorded sequence of [`floyd_core::StreamEvent`]s per call,
//!   advancing to the next scripted turn each time `stream` is invoked.
//! - [`ScriptedTransport`] implements `floyd_mcp::McpTransport` by answering
//!   `tools/call` from a table of canned results keyed by tool name,
//!   optionally with artificial latency so tests can exercise the
//!   declaration-order guarantee (E3) under real concurrency.
//!
//! Both are registered the same way a real client would be: `ScriptedLlm`
//! is handed to `AgentEngine::new` in place of a provider adapter, and
//! `ScriptedTransport` is registered via `McpClientManager::insert_client`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod scripted_llm;
mod scripted_transport;

pub use scripted_llm::ScriptedLlm;
pub use scripted_transport::{ScriptedTransport, ToolScript};

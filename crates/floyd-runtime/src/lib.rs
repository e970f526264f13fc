//! Floyd Runtime — the Agent Engine.
//!
//! Orchestrates one user-visible turn: appends the prompt to a [`Session`],
//! trims history to a token budget, streams from an [`LlmClient`], dispatches
//! tool calls through an [`McpClientManager`] gated by a [`PermissionManager`],
//! and persists every step through a [`SessionStore`]. The public surface is
//! one method, [`AgentEngine::send_message`], returning a lazy stream of
//! [`EngineEvent`]s — see the crate's module docs on [`engine`] for the full
//! state machine.
//!
//! [`Session`]: floyd_core::Session
//! [`LlmClient`]: floyd_llm::LlmClient
//! [`McpClientManager`]: floyd_mcp::McpClientManager
//! [`PermissionManager`]: floyd_approval::PermissionManager
//! [`SessionStore`]: floyd_storage::SessionStore

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod dispatch;
mod engine;
mod error;
mod event;
mod trim;

pub use config::EngineConfig;
pub use engine::{AgentEngine, EventStream};
pub use error::{EngineError, EngineResult};
pub use event::{EngineEvent, PermissionResolution, ToolOutcome};

//! `StreamEvent` — the normalized unit of output from any LLM adapter.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ErrorKind;

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of the assistant's turn.
    End,
    /// The model wants to call one or more tools.
    ToolUse,
    /// Hit the provider's max-tokens limit.
    Length,
    /// The provider's content filter intervened.
    ContentFilter,
    /// The caller's cancel token fired before the stream completed.
    Cancelled,
}

/// The normalized event type every LLM adapter emits.
///
/// Every tool-related variant carries the originating tool-call id so that
/// results can be routed correctly when multiple tools run in the same
/// turn (see `floyd-runtime`'s dispatch sub-protocol). The sequence emitted
/// by one `stream` call is finite and ends with exactly one `Stop` or one
/// `Error`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StreamEvent {
    /// A fragment of assistant-visible text. Never contains reasoning/thinking content.
    TextDelta(String),
    /// A tool call has begun; `id` is unique within the stream.
    ToolCallBegin {
        /// The call's id.
        id: String,
        /// The tool's name.
        name: String,
    },
    /// An incremental fragment of a tool call's JSON arguments.
    ToolCallArgsDelta {
        /// The call this fragment belongs to.
        id: String,
        /// The raw JSON fragment (not necessarily valid JSON on its own).
        fragment: String,
    },
    /// A tool call's arguments are complete and parsed.
    ToolCallEnd {
        /// The call this completes.
        id: String,
        /// Parsed arguments (empty object if parsing the accumulated fragments failed).
        args: Value,
    },
    /// The stream ended normally.
    Stop(StopReason),
    /// The stream ended abnormally. No further events follow.
    Error {
        /// The kind of failure.
        kind: ErrorKind,
        /// A human-readable detail string.
        message: String,
    },
    /// Token usage for the turn, emitted alongside or just before `Stop`.
    Usage {
        /// Input (prompt) tokens.
        input: u64,
        /// Output (completion) tokens.
        output: u64,
    },
}

impl StreamEvent {
    /// The tool-call id this event concerns, if any.
    #[must_use]
    pub fn tool_call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCallBegin { id, .. }
            | Self::ToolCallArgsDelta { id, .. }
            | Self::ToolCallEnd { id, .. } => Some(id),
            _ => None,
        }
    }
}

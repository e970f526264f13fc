//! The cross-crate error taxonomy and its user-facing renderer.
//!
//! `ErrorKind` is the shared tag used by [`crate::StreamEvent::Error`] and by
//! the Agent Engine's caller-facing error event, so consumers match on one
//! type instead of each crate's local `thiserror` enum leaking across the
//! API. Individual crates still define their own `thiserror` error types for
//! internal propagation (`?`); they convert to `ErrorKind` only at the
//! boundary where the distilled taxonomy applies.

use serde::{Deserialize, Serialize};

/// The error taxonomy from the specification's failure-semantics section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing credential, malformed MCP config, invalid provider tag. Fatal at construction.
    Config,
    /// Network failure, WebSocket closed, child process exited.
    Transport,
    /// Malformed LLM event, missing tool-call id, JSON-RPC framing violation.
    Protocol,
    /// The model produced unparseable tool arguments. Recovered locally.
    ToolParse,
    /// A tool call was blocked by policy. Recovered locally.
    PermissionDenied,
    /// The MCP server returned an error for the call. Passed back to the model.
    Tool,
    /// A session save failed.
    Storage,
    /// `max_turns` was reached.
    ExhaustedTurns,
    /// The caller's cancel token fired.
    Cancelled,
}

/// Render an `ErrorKind` + detail as a short, actionable, stack-trace-free
/// message suitable for display to an end user.
#[must_use]
pub fn humanize(kind: ErrorKind, detail: &str) -> String {
    match kind {
        ErrorKind::Config => {
            format!("configuration problem: {detail} — check your .floyd/mcp.json and retry.")
        }
        ErrorKind::Transport => {
            format!("connection problem: {detail} — check the server is running and retry.")
        }
        ErrorKind::Protocol => {
            format!("unexpected response: {detail} — this usually clears up on retry.")
        }
        ErrorKind::ToolParse => {
            format!("the model sent malformed tool arguments ({detail}) — it will see an empty result and can retry.")
        }
        ErrorKind::PermissionDenied => {
            format!("blocked by policy: {detail} — grant access if this was expected.")
        }
        ErrorKind::Tool => format!("tool call failed: {detail}"),
        ErrorKind::Storage => {
            format!("could not save the conversation ({detail}) — your session may be out of sync.")
        }
        ErrorKind::ExhaustedTurns => {
            format!("stopped after the turn limit ({detail}) — ask a narrower question or raise max_turns.")
        }
        ErrorKind::Cancelled => "cancelled.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn humanized_messages_have_no_stack_trace_markers() {
        for kind in [
            ErrorKind::Config,
            ErrorKind::Transport,
            ErrorKind::Protocol,
            ErrorKind::ToolParse,
            ErrorKind::PermissionDenied,
            ErrorKind::Tool,
            ErrorKind::Storage,
            ErrorKind::ExhaustedTurns,
            ErrorKind::Cancelled,
        ] {
            let msg = humanize(kind, "detail");
            assert!(!msg.contains("at src/"));
            assert!(!msg.contains("backtrace"));
        }
    }
}

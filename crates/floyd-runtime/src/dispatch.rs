//! The tool dispatch sub-protocol (§4.6.3): argument normalization, the
//! network-level retry distinct from LLM-stream retry, and the permission
//! resolution → grant-manager bridge.

use std::time::Duration;

use floyd_approval::GrantScope;
use floyd_core::ErrorKind;
use floyd_mcp::{McpClientManager, McpError};
use serde_json::Value;
use tracing::{debug, warn};

use crate::event::PermissionResolution;

/// One tool-use block pending dispatch, as pulled off the assistant message
/// under construction.
#[derive(Debug, Clone)]
pub struct PendingCall {
    /// The `tool_use` block's id.
    pub id: String,
    /// The tool's registered name.
    pub name: String,
    /// Arguments as the LLM adapter parsed them.
    pub args: Value,
}

/// The result of running one call all the way through the sub-protocol.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    /// Text recorded as the tool-result message content, and shown to the caller.
    pub content: String,
    /// Whether this is an error outcome.
    pub is_error: bool,
    /// The error kind, if this is an error outcome.
    pub kind: Option<ErrorKind>,
}

impl DispatchOutcome {
    fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            kind: None,
        }
    }

    fn error(kind: ErrorKind, content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            kind: Some(kind),
        }
    }
}

/// Step 2: normalize whatever the LLM produced as arguments.
///
/// `args` usually already arrives as a parsed object (the adapters parse
/// `tool-call-end`'s accumulated JSON themselves). Some providers, or a
/// hand-rolled adapter, may instead hand back the raw unparsed string; this
/// re-parses that case and, on failure, wraps it rather than failing the
/// turn.
#[must_use]
pub fn normalize_args(args: Value) -> Value {
    match args {
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(parsed) => parsed,
            Err(_) => serde_json::json!({"_parseError": true, "_raw": raw}),
        },
        other => other,
    }
}

/// Step 1 (ask branch): translate the caller's resolution into a permission
/// grant/deny and the effective verdict to dispatch with.
///
/// `Deny` is deliberately not recorded anywhere — it denies only this one
/// call, and an identical tool later in the same turn triggers `ask` again,
/// matching E4.
pub fn apply_resolution(
    permissions: &floyd_approval::PermissionManager,
    tool_name: &str,
    resolution: PermissionResolution,
) -> Result<bool, floyd_approval::ApprovalError> {
    match resolution {
        PermissionResolution::ApproveOnce => {
            permissions.grant(tool_name, GrantScope::Once)?;
            // Consume it immediately so this dispatch proceeds without a
            // second `check` seeing a stale grant.
            let _ = permissions.check(tool_name);
            Ok(true)
        }
        PermissionResolution::ApproveSession => {
            permissions.grant(tool_name, GrantScope::Session)?;
            Ok(true)
        }
        PermissionResolution::ApproveAlways => {
            permissions.grant(tool_name, GrantScope::Always)?;
            Ok(true)
        }
        PermissionResolution::Deny => Ok(false),
    }
}

/// A polite, model-visible denial string (§4.6.3 step 1).
#[must_use]
pub fn permission_denied_outcome() -> DispatchOutcome {
    DispatchOutcome::error(
        ErrorKind::PermissionDenied,
        "This tool call was not permitted by the user's access policy.",
    )
}

/// Step 3 + 4: dispatch via the MCP Client Manager, retrying only the
/// dispatch call itself (never the LLM turn) at most `max_retries` times on
/// a transport-level failure, with exponential backoff starting at
/// `base_delay`.
///
/// A `ToolError` (the MCP server answered, but with an error) is not
/// retried — it is passed back to the model verbatim, per §4.6.3 step 3.
pub async fn dispatch_with_retry(
    mcp: &McpClientManager,
    name: &str,
    args: Value,
    max_retries: u32,
    base_delay: Duration,
) -> DispatchOutcome {
    let mut attempt = 0;
    loop {
        match mcp.call_tool(name, args.clone()).await {
            Ok(value) => return DispatchOutcome::success(render_tool_result(&value)),
            Err(McpError::Transport(transport_err)) if attempt < max_retries => {
                attempt += 1;
                let delay = base_delay * 2u32.pow(attempt - 1);
                warn!(tool = name, attempt, ?delay, error = %transport_err, "retrying tool dispatch after transport failure");
                tokio::time::sleep(delay).await;
            }
            Err(err) => {
                debug!(tool = name, error = %err, "tool dispatch failed");
                return DispatchOutcome::error(ErrorKind::Tool, err.to_string());
            }
        }
    }
}

/// Tool output truncation threshold (§9): a result rendered larger than
/// this is cut to size with an explicit marker rather than spent in full
/// against the model's context.
const MAX_TOOL_RESULT_BYTES: usize = 32 * 1024;

fn render_tool_result(value: &Value) -> String {
    let rendered = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    truncate_tool_result(rendered)
}

fn truncate_tool_result(rendered: String) -> String {
    if rendered.len() <= MAX_TOOL_RESULT_BYTES {
        return rendered;
    }
    let omitted = rendered.len() - MAX_TOOL_RESULT_BYTES;
    let mut boundary = MAX_TOOL_RESULT_BYTES;
    while boundary > 0 && !rendered.is_char_boundary(boundary) {
        boundary -= 1;
    }
    format!("{}\n[truncated, {omitted} bytes omitted]", &rendered[..boundary])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_plain_object_passes_through_unchanged() {
        let args = serde_json::json!({"x": 1});
        assert_eq!(normalize_args(args.clone()), args);
    }

    #[test]
    fn a_valid_json_string_is_parsed() {
        let args = normalize_args(Value::String(r#"{"x": 1}"#.to_string()));
        assert_eq!(args, serde_json::json!({"x": 1}));
    }

    #[test]
    fn an_unparseable_string_is_wrapped_not_failed() {
        let args = normalize_args(Value::String("{not json".to_string()));
        assert_eq!(args["_parseError"], Value::Bool(true));
        assert_eq!(args["_raw"], Value::String("{not json".to_string()));
    }

    #[test]
    fn denial_resolution_applies_nothing() {
        let manager = floyd_approval::PermissionManager::in_memory(vec![]).unwrap();
        let proceed = apply_resolution(&manager, "shell", PermissionResolution::Deny).unwrap();
        assert!(!proceed);
        assert_eq!(manager.check("shell"), floyd_core::Verdict::Ask);
    }

    #[test]
    fn approve_once_consumes_itself() {
        let manager = floyd_approval::PermissionManager::in_memory(vec![]).unwrap();
        let proceed = apply_resolution(&manager, "shell", PermissionResolution::ApproveOnce).unwrap();
        assert!(proceed);
        assert_eq!(manager.check("shell"), floyd_core::Verdict::Ask);
    }

    #[test]
    fn a_short_result_is_not_truncated() {
        let rendered = render_tool_result(&Value::String("short result".to_string()));
        assert_eq!(rendered, "short result");
    }

    #[test]
    fn an_oversized_result_is_cut_with_an_explicit_marker() {
        let huge = "a".repeat(MAX_TOOL_RESULT_BYTES + 100);
        let rendered = render_tool_result(&Value::String(huge));
        assert!(rendered.starts_with(&"a".repeat(100)));
        assert!(rendered.ends_with("[truncated, 100 bytes omitted]"));
        assert!(rendered.len() < MAX_TOOL_RESULT_BYTES + 100);
    }

    #[test]
    fn truncation_never_splits_a_multi_byte_character() {
        let rendered = truncate_tool_result("é".repeat(MAX_TOOL_RESULT_BYTES));
        assert!(rendered.is_char_boundary(rendered.find('\n').unwrap()));
    }
}

//! Permission rules — the static policy the Permission Manager evaluates.

use serde::{Deserialize, Serialize};

/// The Permission Manager's answer for a tool name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Proceed immediately.
    Allow,
    /// Pause and ask the caller.
    Ask,
    /// Refuse; the model is told the call was denied.
    Deny,
}

/// One (glob-pattern, verdict) pair. Rules are evaluated in order; the
/// first pattern that matches a tool name wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    /// A glob pattern over tool names (`*`, `prefix-*`, or an exact name).
    pub pattern: String,
    /// The verdict to return when this rule matches.
    pub verdict: Verdict,
}

impl PermissionRule {
    /// Construct a rule.
    pub fn new(pattern: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            pattern: pattern.into(),
            verdict,
        }
    }
}

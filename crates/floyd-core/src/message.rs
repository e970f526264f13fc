//! Messages and content blocks — the unit of conversation history.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The role a [`Message`] was authored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Instructions that precede the conversation. Always index 0 if present.
    System,
    /// A message from the human user.
    User,
    /// A message produced by the model.
    Assistant,
    /// A tool result answering an earlier `tool_use` block.
    Tool,
}

/// One typed block inside a message's content.
///
/// An assistant message's content is an ordered list of these; a `tool`
/// message's content is, in practice, always exactly one [`ContentBlock::ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain assistant-visible text.
    Text {
        /// The text.
        text: String,
    },
    /// An announcement that the model wants to invoke a tool.
    ToolUse {
        /// Unique within the session (see [`Message`] invariants).
        id: String,
        /// The tool's registered name.
        name: String,
        /// Parsed arguments. `{"_parseError": true, "_raw": ...}` on parse failure.
        input: Value,
    },
    /// The result of a tool call, bound to the `tool_use` block that requested it.
    ToolResult {
        /// Matches a prior `ToolUse::id`.
        tool_use_id: String,
        /// Result text (or a rendered error string).
        content: String,
        /// Whether the tool call failed.
        #[serde(default)]
        is_error: bool,
    },
}

impl ContentBlock {
    /// Build a text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Build a tool-use block.
    pub fn tool_use(id: impl Into<String>, name: impl Into<String>, input: Value) -> Self {
        Self::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
        }
    }

    /// Build a successful tool-result block.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Build a failed tool-result block.
    pub fn tool_error(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::ToolResult {
            tool_use_id: tool_use_id.into(),
            content: content.into(),
            is_error: true,
        }
    }

    /// The `tool_use` id this block announces or answers, if any.
    #[must_use]
    pub fn tool_id(&self) -> Option<&str> {
        match self {
            Self::ToolUse { id, .. } => Some(id),
            Self::ToolResult { tool_use_id, .. } => Some(tool_use_id),
            Self::Text { .. } => None,
        }
    }
}

/// Either plain text or an ordered list of content blocks.
///
/// Most provider-facing messages (user prompts, tool results) are plain
/// text; assistant messages that call tools need the block form so that
/// text and `tool_use` announcements can be interleaved and still recorded
/// in the order the model produced them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    /// Plain text shorthand, used for user/system/tool messages.
    Text(String),
    /// Ordered content blocks, used for assistant messages with tool calls.
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// Flatten to a plain string, concatenating block text and dropping
    /// non-text blocks. Used for token estimation and title inference.
    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join(""),
        }
    }

    /// The content blocks, if this is the block form.
    #[must_use]
    pub fn blocks(&self) -> Option<&[ContentBlock]> {
        match self {
            Self::Blocks(b) => Some(b),
            Self::Text(_) => None,
        }
    }
}

/// One entry in a [`crate::Session`]'s history.
///
/// Invariants (enforced by the constructors below, and by the Agent Engine
/// that appends to a session):
///
/// - every `tool` message carries a `tool_use_id` referring to an earlier
///   `tool_use` block in an assistant message;
/// - a `tool_use` block's `id` is unique within a session;
/// - the system message, if present, is the first message and is never
///   removed by history trimming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Who authored this message.
    pub role: Role,
    /// The message body.
    pub content: MessageContent,
    /// For `tool`-role messages, the `tool_use` id this answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    /// Unknown fields from a newer writer, preserved verbatim on round-trip.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Message {
    /// A system message. Callers are responsible for keeping it at index 0.
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: MessageContent::Text(text.into()),
            tool_use_id: None,
            extra: Map::new(),
        }
    }

    /// A plain user message.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: MessageContent::Text(text.into()),
            tool_use_id: None,
            extra: Map::new(),
        }
    }

    /// An assistant message built from accumulated content blocks.
    #[must_use]
    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Blocks(blocks),
            tool_use_id: None,
            extra: Map::new(),
        }
    }

    /// A plain-text assistant message (no tool calls).
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: MessageContent::Text(text.into()),
            tool_use_id: None,
            extra: Map::new(),
        }
    }

    /// A tool-result message answering `tool_use_id`.
    pub fn tool_result(tool_use_id: impl Into<String>, content: impl Into<String>) -> Self {
        let tool_use_id = tool_use_id.into();
        Self {
            role: Role::Tool,
            content: MessageContent::Text(content.into()),
            tool_use_id: Some(tool_use_id),
            extra: Map::new(),
        }
    }

    /// All `tool_use` ids announced by this message (empty unless it is an
    /// assistant message with block content).
    #[must_use]
    pub fn tool_use_ids(&self) -> Vec<&str> {
        match &self.content {
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                    _ => None,
                })
                .collect(),
            MessageContent::Text(_) => Vec::new(),
        }
    }

    /// True if this assistant message contains at least one `tool_use` block.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_use_ids().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_round_trips_through_json() {
        let msg = Message::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back.content.as_text(), "hello");
        assert_eq!(back.role, Role::User);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let mut msg = Message::user("hi");
        msg.extra
            .insert("future_field".into(), Value::String("kept".into()));
        let json = serde_json::to_string(&msg).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(
            back.extra.get("future_field"),
            Some(&Value::String("kept".into()))
        );
    }

    #[test]
    fn assistant_with_tool_use_reports_its_ids() {
        let msg = Message::assistant(vec![
            ContentBlock::text("let me check"),
            ContentBlock::tool_use("a", "sum", serde_json::json!({"x": 1})),
        ]);
        assert_eq!(msg.tool_use_ids(), vec!["a"]);
        assert!(msg.has_tool_calls());
    }
}

//! Session identity and the durable conversation record.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::message::Message;

/// Opaque session identifier — a random 128-bit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh, random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Render as the canonical hyphenated form, used for filenames.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.0.to_string()
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One conversation: identity, timestamps, working-directory hint, and the
/// ordered message history.
///
/// A `Session` is exclusively owned by the Agent Engine that opened it; the
/// Session Store owns only its on-disk bytes. Mutation happens only through
/// the Agent Engine and [`crate::Session`]-adjacent Session Store methods.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Identity.
    pub id: SessionId,
    /// When the session was first created.
    pub created_at: DateTime<Utc>,
    /// When the session was last appended to.
    pub updated_at: DateTime<Utc>,
    /// The working directory the caller opened this session against.
    pub cwd: PathBuf,
    /// A short, human title. Inferred from the first user message if empty.
    #[serde(default)]
    pub title: String,
    /// The ordered conversation history. Index 0 is the system message, if any.
    #[serde(default)]
    pub messages: Vec<Message>,
    /// Unknown fields from a newer writer, preserved verbatim on round-trip.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

impl Session {
    /// Create a new, empty session rooted at `cwd`.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            created_at: now,
            updated_at: now,
            cwd,
            title: String::new(),
            messages: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Append a message, bumping `updated_at` and inferring a title from the
    /// first user message if none has been set yet.
    pub fn append(&mut self, message: Message) {
        if self.title.is_empty() && matches!(message.role, crate::Role::User) {
            self.title = infer_title(&message.content.as_text());
        }
        self.messages.push(message);
        self.updated_at = Utc::now();
    }

    /// The system message, if this session has one (always index 0).
    #[must_use]
    pub fn system_message(&self) -> Option<&Message> {
        self.messages
            .first()
            .filter(|m| matches!(m.role, crate::Role::System))
    }

    /// A read-only snapshot summary for external (UI) consumption.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            title: self.title.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Derive a title from a message's opening text: trim to ~40 chars on a
/// word boundary, append an ellipsis if shortened.
#[must_use]
pub fn infer_title(text: &str) -> String {
    const MAX: usize = 40;
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(MAX).collect();
    let cut = truncated
        .rfind(char::is_whitespace)
        .map_or(truncated.as_str(), |idx| &truncated[..idx]);
    let cut = if cut.is_empty() { &truncated } else { cut };
    format!("{}…", cut.trim_end())
}

/// A lightweight listing entry: id, title, and last-updated time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Short title (may be empty if no user message has arrived yet).
    pub title: String,
    /// Last-updated timestamp, used to order listings newest-first.
    pub updated_at: DateTime<Utc>,
}

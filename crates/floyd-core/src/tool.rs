//! Tool descriptors — the shape the LLM sees for a callable tool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name, description, and JSON-Schema of a tool's arguments.
///
/// Uniqueness of names across all connected MCP servers is the Client
/// Manager's responsibility; this type carries no opinion about where the
/// tool came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// The name the LLM calls this tool by. Must be unique in the catalogue
    /// handed to one `stream` call.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON-Schema of the accepted arguments object.
    pub input_schema: Value,
}

impl ToolDescriptor {
    /// Build a descriptor, defaulting to an empty object schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Attach a schema.
    #[must_use]
    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

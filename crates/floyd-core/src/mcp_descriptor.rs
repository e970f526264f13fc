//! The on-disk shape of one configured MCP server.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How to reach an MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Transport {
    /// Spawn a subprocess and speak JSON-RPC over its stdin/stdout.
    Stdio {
        /// The executable to spawn.
        command: String,
        /// Arguments passed to the executable.
        #[serde(default)]
        args: Vec<String>,
        /// Extra environment variables for the child process.
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        env: HashMap<String, String>,
    },
    /// Open an outbound WebSocket connection.
    Websocket {
        /// The `ws://` or `wss://` URL to connect to.
        url: String,
    },
}

/// One entry in `.floyd/mcp.json`'s `servers` array.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerDescriptor {
    /// Unique identifier for this server within the config file.
    pub name: String,
    /// Whether this server should be connected on `connectFromConfig`.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// How to reach it.
    pub transport: Transport,
    /// Unknown fields from a newer writer, preserved verbatim on round-trip.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

fn default_enabled() -> bool {
    true
}

/// The top-level shape of `.floyd/mcp.json` / `.floyd/mcp.config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfigFile {
    /// Config format version, currently always `"1.0"`.
    pub version: String,
    /// The configured servers.
    #[serde(default)]
    pub servers: Vec<McpServerDescriptor>,
    /// Unknown fields from a newer writer, preserved verbatim on round-trip.
    #[serde(flatten, default, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

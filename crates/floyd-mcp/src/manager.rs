//! The MCP Client Manager: a named set of connected MCP servers.

use std::collections::HashMap;
use std::sync::Arc;

use floyd_core::{McpServerDescriptor, ToolDescriptor, Transport};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{McpError, McpResult};
use crate::transport::{LocalToolFacade, McpTransport, StdioTransport, WsClientTransport};

/// A `{name, kept_server, shadowed_server}` record logged when two servers
/// register a tool with the same name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCollision {
    /// The colliding tool name.
    pub name: String,
    /// The server whose tool is kept (first-registered).
    pub kept_server: String,
    /// The server whose tool was shadowed.
    pub shadowed_server: String,
}

/// The outcome of [`McpClientManager::connect_from_config`].
#[derive(Debug, Clone, Default)]
pub struct ConnectSummary {
    /// Server names that connected successfully.
    pub connected: Vec<String>,
    /// `(server name, error detail)` for servers that failed to connect.
    pub failed: Vec<(String, String)>,
}

struct ClientEntry {
    transport: Arc<dyn McpTransport>,
    tools: Vec<ToolDescriptor>,
}

/// Holds one connected client per configured MCP server and an aggregated,
/// collision-resolved tool catalogue.
#[derive(Default)]
pub struct McpClientManager {
    clients: RwLock<HashMap<String, ClientEntry>>,
    collisions: RwLock<Vec<ToolCollision>>,
}

impl McpClientManager {
    /// An empty manager with no connected servers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an already-connected transport under `name`, as if it had
    /// come from `connect_from_config`.
    ///
    /// Used by callers that already hold a transport handle obtained some
    /// other way (and by test fixtures that stand in for a real server
    /// without spawning a subprocess or opening a socket). Rebuilds the
    /// aggregate cache and re-resolves collisions afterward.
    pub async fn insert_client(&self, name: impl Into<String>, transport: Arc<dyn McpTransport>, tools: Vec<ToolDescriptor>) {
        self.clients
            .write()
            .await
            .insert(name.into(), ClientEntry { transport, tools });
        self.rebuild_collisions().await;
    }

    /// Connect to every `enabled` entry in `servers`, in parallel.
    ///
    /// Individual connection failures do not abort the others; each is
    /// recorded in the returned summary. Name collisions across the newly
    /// (and previously) connected servers' tool catalogues are resolved
    /// first-registered-wins, ordered deterministically by server name
    /// (not connection completion order), and recorded via
    /// [`McpClientManager::collisions`].
    pub async fn connect_from_config(&self, servers: &[McpServerDescriptor]) -> ConnectSummary {
        let enabled: Vec<&McpServerDescriptor> = servers.iter().filter(|s| s.enabled).collect();

        let attempts = futures::future::join_all(enabled.iter().map(|server| async move {
            let result = connect_one(server).await;
            (server.name.clone(), result)
        }))
        .await;

        let mut summary = ConnectSummary::default();
        let mut clients = self.clients.write().await;
        for (name, result) in attempts {
            match result {
                Ok((transport, tools)) => {
                    clients.insert(name.clone(), ClientEntry { transport, tools });
                    summary.connected.push(name);
                }
                Err(detail) => summary.failed.push((name, detail)),
            }
        }
        drop(clients);

        self.rebuild_collisions().await;
        summary
    }

    /// The aggregated tool catalogue across all connected clients,
    /// first-registered-wins on name collision.
    ///
    /// Iterates clients sorted by server name — the same deterministic
    /// order `rebuild_collisions` uses — so the descriptor kept here always
    /// agrees with the `kept_server` recorded in `collisions()`.
    pub async fn list_tools(&self) -> Vec<ToolDescriptor> {
        let clients = self.clients.read().await;
        let mut entries: Vec<(&String, &ClientEntry)> = clients.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut seen = std::collections::HashSet::new();
        let mut tools = Vec::new();
        for (_, entry) in entries {
            for tool in &entry.tools {
                if seen.insert(tool.name.clone()) {
                    tools.push(tool.clone());
                }
            }
        }
        tools
    }

    /// Dispatch `name(args)` to its owning client.
    ///
    /// # Errors
    /// [`McpError::ToolUnavailable`] if no connected client owns `name`
    /// (including the case where its owning server disconnected since the
    /// tool was listed — the aggregate cache is rebuilt in that case).
    /// [`McpError::Transport`] if the call itself fails at the transport level.
    pub async fn call_tool(&self, name: &str, args: Value) -> McpResult<Value> {
        let owner = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .find(|(_, entry)| entry.tools.iter().any(|t| t.name == name))
                .map(|(server_name, entry)| (server_name.clone(), entry.transport.clone()))
        };

        let Some((server_name, transport)) = owner else {
            return Err(McpError::ToolUnavailable(name.to_string()));
        };

        match transport
            .call("tools/call", serde_json::json!({"name": name, "arguments": args}))
            .await
        {
            Ok(value) => Ok(value),
            Err(err) => {
                // The owning client may have gone away between listing and
                // calling; rebuild the cache so the next list reflects reality.
                if !self.clients.read().await.contains_key(&server_name) {
                    self.rebuild_collisions().await;
                }
                Err(McpError::Transport(err))
            }
        }
    }

    /// Disconnect `name`, closing its transport and rebuilding the
    /// aggregate cache from the remaining clients.
    ///
    /// # Errors
    /// [`McpError::UnknownServer`] if `name` was never connected.
    pub async fn disconnect(&self, name: &str) -> McpResult<()> {
        let entry = self.clients.write().await.remove(name);
        let Some(entry) = entry else {
            return Err(McpError::UnknownServer(name.to_string()));
        };
        entry.transport.close().await;
        self.rebuild_collisions().await;
        Ok(())
    }

    /// The collision records from the most recent `connect_from_config`.
    pub async fn collisions(&self) -> Vec<ToolCollision> {
        self.collisions.read().await.clone()
    }

    async fn rebuild_collisions(&self) {
        let clients = self.clients.read().await;
        let mut owner: HashMap<String, String> = HashMap::new();
        let mut collisions = Vec::new();
        // HashMap iteration order is unspecified; sort by server name so
        // first-registered-wins is deterministic across runs.
        let mut entries: Vec<(&String, &ClientEntry)> = clients.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        for (server_name, entry) in entries {
            for tool in &entry.tools {
                if let Some(kept) = owner.get(&tool.name) {
                    collisions.push(ToolCollision {
                        name: tool.name.clone(),
                        kept_server: kept.clone(),
                        shadowed_server: server_name.clone(),
                    });
                } else {
                    owner.insert(tool.name.clone(), server_name.clone());
                }
            }
        }
        *self.collisions.write().await = collisions;
    }
}

/// Exposes the manager's own aggregated catalogue and dispatch over the
/// MCP WebSocket Server (§2, §4.4), so a remote MCP client (the browser
/// extension) reaches the same tools the Agent Engine sees — through this
/// narrow facade, never by reaching into the manager's private state.
#[async_trait::async_trait]
impl LocalToolFacade for McpClientManager {
    async fn list_tools(&self) -> Vec<Value> {
        self.list_tools()
            .await
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name,
                    "description": tool.description,
                    "input_schema": tool.input_schema,
                })
            })
            .collect()
    }

    async fn call_tool(&self, name: &str, args: Value) -> Result<Value, String> {
        self.call_tool(name, args).await.map_err(|e| e.to_string())
    }

    async fn status(&self) -> Value {
        let clients = self.clients.read().await;
        serde_json::json!({
            "connectedServers": clients.len(),
            "tools": clients.values().map(|e| e.tools.len()).sum::<usize>(),
        })
    }
}

async fn connect_one(
    server: &McpServerDescriptor,
) -> Result<(Arc<dyn McpTransport>, Vec<ToolDescriptor>), String> {
    let transport: Arc<dyn McpTransport> = match &server.transport {
        Transport::Stdio { command, args, env } => StdioTransport::spawn(command, args, env)
            .await
            .map_err(|e| e.to_string())?,
        Transport::Websocket { url } => WsClientTransport::connect(url).await.map_err(|e| e.to_string())?,
    };

    let response = transport
        .call("tools/list", Value::Null)
        .await
        .map_err(|e| e.to_string())?;
    let tools: Vec<ToolDescriptor> = response
        .get("tools")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e| e.to_string())?
        .unwrap_or_default();

    Ok((transport, tools))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fresh_manager_has_no_tools_or_collisions() {
        let manager = McpClientManager::new();
        assert!(manager.list_tools().await.is_empty());
        assert!(manager.collisions().await.is_empty());
    }

    #[tokio::test]
    async fn calling_an_unknown_tool_is_unavailable() {
        let manager = McpClientManager::new();
        let result = manager.call_tool("does-not-exist", Value::Null).await;
        assert!(matches!(result, Err(McpError::ToolUnavailable(_))));
    }

    #[tokio::test]
    async fn disconnecting_an_unknown_server_errors() {
        let manager = McpClientManager::new();
        assert!(matches!(manager.disconnect("ghost").await, Err(McpError::UnknownServer(_))));
    }

    /// A transport that always succeeds with a fixed value, used only to
    /// exercise `list_tools`'s ordering and the `LocalToolFacade` impl.
    struct EchoTransport(Value);

    #[async_trait::async_trait]
    impl McpTransport for EchoTransport {
        async fn call(&self, _method: &str, _params: Value) -> Result<Value, crate::error::TransportError> {
            Ok(self.0.clone())
        }

        async fn notify(&self, _method: &str, _params: Value) -> Result<(), crate::error::TransportError> {
            Ok(())
        }

        async fn close(&self) {}
    }

    #[tokio::test]
    async fn list_tools_resolves_collisions_in_server_name_order_regardless_of_insertion_order() {
        let manager = McpClientManager::new();
        manager
            .insert_client(
                "zeta",
                Arc::new(EchoTransport(Value::Null)),
                vec![ToolDescriptor::new("search", "zeta's search")],
            )
            .await;
        manager
            .insert_client(
                "alpha",
                Arc::new(EchoTransport(Value::Null)),
                vec![ToolDescriptor::new("search", "alpha's search")],
            )
            .await;

        let tools = manager.list_tools().await;
        let search = tools.iter().find(|t| t.name == "search").unwrap();
        assert_eq!(search.description, "alpha's search");

        let collisions = manager.collisions().await;
        assert_eq!(collisions[0].kept_server, "alpha");
        assert_eq!(collisions[0].shadowed_server, "zeta");
    }

    #[tokio::test]
    async fn local_tool_facade_projects_descriptors_and_forwards_calls() {
        let manager = McpClientManager::new();
        manager
            .insert_client(
                "calc",
                Arc::new(EchoTransport(serde_json::json!("7"))),
                vec![ToolDescriptor::new("sum", "adds two numbers")],
            )
            .await;

        let facade: &dyn LocalToolFacade = &manager;
        let tools = facade.list_tools().await;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "sum");
        assert_eq!(tools[0]["description"], "adds two numbers");

        let result = facade.call_tool("sum", serde_json::json!({"x": 3, "y": 4})).await.unwrap();
        assert_eq!(result, serde_json::json!("7"));

        let status = facade.status().await;
        assert_eq!(status["connectedServers"], 1);
        assert_eq!(status["tools"], 1);
    }
}

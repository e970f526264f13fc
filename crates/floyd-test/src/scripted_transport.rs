use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use floyd_mcp::{McpTransport, TransportError};
use serde_json::Value;

/// One canned behavior for a tool name: a result and an optional artificial
/// delay before it resolves.
///
/// The delay exists to exercise the declaration-order-not-completion-order
/// guarantee (E3): script the second-declared call to resolve first and
/// confirm the caller still observes `toolFinished` in declaration order.
#[derive(Clone)]
pub struct ToolScript {
    /// The value returned as the tool's result, or the detail text of a
    /// `tools/call` failure.
    pub result: Result<Value, String>,
    /// Artificial latency before `call` resolves.
    pub delay: Duration,
}

impl ToolScript {
    /// An immediate success, rendering `value` as the tool result.
    #[must_use]
    pub fn ok(value: impl Into<Value>) -> Self {
        Self {
            result: Ok(value.into()),
            delay: Duration::ZERO,
        }
    }

    /// An immediate failure.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            result: Err(message.into()),
            delay: Duration::ZERO,
        }
    }

    /// Attach an artificial delay before this script resolves.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A stand-in MCP transport answering `tools/call` from a canned table and
/// `tools/list` from a fixed descriptor payload, without spawning a
/// subprocess or opening a socket.
///
/// Registered with a running engine via
/// `McpClientManager::insert_client(name, transport, tools)` — the same
/// facade a real connected client uses.
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, ToolScript>>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    /// Build a transport from a table of per-tool-name canned results.
    #[must_use]
    pub fn new(scripts: HashMap<String, ToolScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Tool names called so far, in call order — an assertion helper for
    /// tests that care about dispatch ordering.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

#[async_trait]
impl McpTransport for ScriptedTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        if method != "tools/call" {
            return Err(TransportError::Io(format!(
                "ScriptedTransport only answers tools/call, got {method}"
            )));
        }

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.calls.lock().expect("lock poisoned").push(name.clone());

        let script = self.scripts.lock().expect("lock poisoned").get(&name).cloned();
        let Some(script) = script else {
            return Err(TransportError::Io(format!("no script registered for tool {name:?}")));
        };

        if !script.delay.is_zero() {
            tokio::time::sleep(script.delay).await;
        }
        script.result.map_err(TransportError::Io)
    }

    async fn notify(&self, _method: &str, _params: Value) -> Result<(), TransportError> {
        Ok(())
    }

    async fn close(&self) {}
}

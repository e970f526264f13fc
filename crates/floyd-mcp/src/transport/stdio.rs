//! Stdio transport: one JSON-RPC frame per line over a child process's stdio.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{oneshot, Mutex};

use crate::error::TransportError;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};

use super::{McpTransport, DEFAULT_REQUEST_TIMEOUT};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, TransportError>>>>>;

/// A connected stdio MCP server.
pub struct StdioTransport {
    stdin: Mutex<ChildStdin>,
    child: Mutex<Child>,
    pending: PendingMap,
    next_id: AtomicU64,
    request_timeout: std::time::Duration,
}

impl StdioTransport {
    /// Spawn `command args...` and complete the `initialize` handshake.
    ///
    /// # Errors
    /// Returns [`TransportError::Io`] if the process cannot be spawned, or
    /// [`TransportError::Closed`]/[`TransportError::Timeout`] if the
    /// handshake does not complete.
    pub async fn spawn(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Arc<Self>, TransportError> {
        Self::spawn_with_timeout(command, args, env, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Like [`Self::spawn`], but with an explicit per-request timeout
    /// instead of [`DEFAULT_REQUEST_TIMEOUT`] (mainly for tests).
    pub async fn spawn_with_timeout(
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
        request_timeout: std::time::Duration,
    ) -> Result<Arc<Self>, TransportError> {
        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| TransportError::Io(e.to_string()))?;
        let stdin = child.stdin.take().ok_or_else(|| TransportError::Io("no stdin".to_string()))?;
        let stdout = child.stdout.take().ok_or_else(|| TransportError::Io("no stdout".to_string()))?;

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        spawn_reader(BufReader::new(stdout), pending.clone());

        let transport = Arc::new(Self {
            stdin: Mutex::new(stdin),
            child: Mutex::new(child),
            pending,
            next_id: AtomicU64::new(1),
            request_timeout,
        });

        transport
            .call("initialize", serde_json::json!({}))
            .await?;

        Ok(transport)
    }

    async fn write_frame(&self, request: &JsonRpcRequest) -> Result<(), TransportError> {
        let mut line = serde_json::to_string(request).map_err(|e| TransportError::Io(e.to_string()))?;
        line.push('\n');
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }
}

fn spawn_reader(mut reader: BufReader<tokio::process::ChildStdout>, pending: PendingMap) {
    tokio::spawn(async move {
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let Ok(response) = serde_json::from_str::<JsonRpcResponse>(line.trim_end()) else {
                        tracing::warn!(frame = %line.trim_end(), "skipping malformed stdio MCP frame");
                        continue;
                    };
                    let Some(id) = response.id else { continue };
                    if let Some(sender) = pending.lock().await.remove(&id) {
                        let _ = sender.send(response.into_result().map_err(|e| TransportError::Io(e.message)));
                    }
                }
            }
        }
        // EOF or read error: the child is gone. Fail every still-pending request.
        let mut pending = pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(TransportError::Closed));
        }
    });
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let request = JsonRpcRequest::call(id, method, params);
        if let Err(err) = self.write_frame(&request).await {
            self.pending.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(received) => received.unwrap_or(Err(TransportError::Closed)),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(TransportError::Timeout)
            }
        }
    }

    async fn notify(&self, method: &str, params: Value) -> Result<(), TransportError> {
        self.write_frame(&JsonRpcRequest::notification(method, params)).await
    }

    async fn close(&self) {
        let _ = self.notify("shutdown", Value::Null).await;
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let mut child = self.child.lock().await;
        let grace = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait()).await;
        if grace.is_err() {
            let _ = child.kill().await;
        }
        let mut pending = self.pending.lock().await;
        for (_, sender) in pending.drain() {
            let _ = sender.send(Err(TransportError::Closed));
        }
    }
}

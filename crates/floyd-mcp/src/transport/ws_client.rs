//! WebSocket client transport with a stale-pending-request sweep.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::error::TransportError;
use crate::rpc::{JsonRpcRequest, JsonRpcResponse};

use super::{McpTransport, DEFAULT_REQUEST_TIMEOUT};

const SWEEP_INTERVAL: Duration = Duration::from_secs(10);
const PENDING_TIMEOUT: Duration = Duration::from_secs(60);

type PendingMap = Arc<Mutex<HashMap<u64, (oneshot::Sender<Result<Value, TransportError>>, Instant)>>>;

/// An outbound WebSocket connection to an MCP server.
pub struct WsClientTransport {
    sink: Mutex<futures::stream::SplitSink<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
        Message,
    >>,
    pending: PendingMap,
    next_id: AtomicU64,
    request_timeout: Duration,
}

impl WsClientTransport {
    /// Connect to `url` and complete the `initialize` handshake.
    ///
    /// # Errors
    /// Returns [`TransportError::Io`] if the connection cannot be opened.
    pub async fn connect(url: &str) -> Result<Arc<Self>, TransportError> {
        Self::connect_with_timeout(url, DEFAULT_REQUEST_TIMEOUT).await
    }

    /// Like [`Self::connect`], but with an explicit per-request timeout
    /// instead of [`DEFAULT_REQUEST_TIMEOUT`] (mainly for tests).
    pub async fn connect_with_timeout(url: &str, request_timeout: Duration) -> Result<Arc<Self>, TransportError> {
        let (stream, _response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| TransportError::Io(e.to_string()))?;
        let (sink, stream) = stream.split();

        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        spawn_reader(stream, pending.clone());
        spawn_sweep(pending.clone());

        let transport = Arc::new(Self {
            sink: Mutex::new(sink),
            pending,
            next_id: AtomicU64::new(1),
            request_timeout,
        });

        transport.call("initialize", serde_json::json!({})).await?;
        Ok(transport)
    }
}

fn spawn_reader(
    mut stream: futures::stream::SplitStream<
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    >,
    pending: PendingMap,
) {
    tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let Ok(response) = serde_json::from_str::<JsonRpcResponse>(&text) else {
                        tracing::warn!(frame = %text, "skipping malformed websocket MCP frame");
                        continue;
                    };
                    let Some(id) = response.id else { continue };
                    if let Some((sender, _)) = pending.lock().await.remove(&id) {
                        let _ = sender.send(response.into_result().map_err(|e| TransportError::Io(e.message)));
                    }
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
        let mut pending = pending.lock().await;
        for (_, (sender, _)) in pending.drain() {
            let _ = sender.send(Err(TransportError::Closed));
        }
    });
}

fn spawn_sweep(pending: PendingMap) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let mut pending = pending.lock().await;
            let stale: Vec<u64> = pending
                .iter()
                .filter(|(_, (_, inserted_at))| inserted_at.elapsed() > PENDING_TIMEOUT)
                .map(|(id, _)| *id)
                .collect();
            for id in stale {
                if let Some((sender, _)) = pending.remove(&id) {
                    let _ = sender.send(Err(TransportError::Timeout));
                }
            }
        }
    });
}

#[async_trait]
impl McpTransport for WsClientTransport {
    async fn call(&self, method: &str, params: Value) -> Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, (tx, Instant::now()));

        let request = JsonRpcRequest::call(id, method, params);
        let text = serde_json::to_string(&request).map_err(|e| TransportError::Io(e.to_string()))?;
        if let Err(err) = self.sink.lock().await.send(Message::Text(text)).await {
            self.pending.lock().await.remove(&id);
            return Err(TransportError::Io(err.to_string()));
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
        let request = JsonRpcRequest::notification(method, params);
        let text = serde_json::to_string(&request).map_err(|e| TransportError::Io(e.to_string()))?;
        self.sink
            .lock()
            .await
            .send(Message::Text(text))
            .await
            .map_err(|e| TransportError::Io(e.to_string()))
    }

    async fn close(&self) {
        let _ = self.sink.lock().await.send(Message::Close(None)).await;
        let mut pending = self.pending.lock().await;
        for (_, (sender, _)) in pending.drain() {
            let _ = sender.send(Err(TransportError::Closed));
        }
    }
}

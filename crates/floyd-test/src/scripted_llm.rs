use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use floyd_core::{CancelToken, Message, StopReason, StreamEvent, ToolDescriptor};
use floyd_llm::{LlmClient, StreamBox};

/// A stand-in `LlmClient` that replays one scripted event sequence per call.
///
/// Construct with one `Vec<StreamEvent>` per expected turn. Each call to
/// `stream` consumes the next turn's script and advances an internal
/// cursor, so a test driving a multi-iteration tool-use loop (E2, E3) hands
/// the engine a fresh script for every round trip. Calling `stream` more
/// times than scripts were provided panics — a clear signal the test
/// under-scripted the engine's iteration count rather than a silent hang.
///
/// Between events, the stream checks `cancel` and briefly yields to the
/// executor so a concurrently-running cancel (E6) is observed mid-sequence
/// rather than only at the next `.await` of the whole future.
pub struct ScriptedLlm {
    turns: Mutex<Vec<Vec<StreamEvent>>>,
    cursor: AtomicUsize,
    calls: AtomicUsize,
}

impl ScriptedLlm {
    /// Build a scripted client from one event sequence per expected turn.
    #[must_use]
    pub fn new(turns: Vec<Vec<StreamEvent>>) -> Self {
        Self {
            turns: Mutex::new(turns),
            cursor: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
        }
    }

    /// A single-turn convenience constructor.
    #[must_use]
    pub fn single_turn(events: Vec<StreamEvent>) -> Self {
        Self::new(vec![events])
    }

    /// How many times `stream` has been called so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn stream(&self, _history: &[Message], _tools: &[ToolDescriptor], cancel: CancelToken) -> StreamBox {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        let events = {
            let turns = self.turns.lock().expect("lock poisoned");
            turns.get(index).cloned().unwrap_or_else(|| {
                panic!(
                    "ScriptedLlm: stream() called for turn {index} but only {} turn(s) were scripted",
                    turns.len()
                )
            })
        };

        Box::pin(stream! {
            for event in events {
                if cancel.is_cancelled() {
                    yield StreamEvent::Stop(StopReason::Cancelled);
                    return;
                }
                let terminal = matches!(event, StreamEvent::Stop(_) | StreamEvent::Error { .. });
                yield event;
                if terminal {
                    return;
                }
                // Give a concurrently-firing cancel token a chance to land
                // before the next event goes out.
                tokio::time::sleep(Duration::from_millis(1)).await;
            }
        })
    }
}

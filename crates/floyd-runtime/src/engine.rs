//! The Agent Engine: one `AgentEngine` per open [`Session`], driving the
//! tool-use loop described in the crate's module docs.
//!
//! # State diagram (§4.6.5)
//!
//! `Idle -> Streaming -> DispatchingTools -> Streaming -> ... -> Done | Error | Cancelled`
//!
//! Transitions are driven solely by `stop` events from the LLM and by tool
//! dispatch completion; there is no re-entrant state transition, enforced
//! here by a turn guard (`turn_guard`) held for the lifetime of the
//! returned event stream.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::stream;
use floyd_approval::PermissionManager;
use floyd_core::{CancelToken, ContentBlock, ErrorKind, Message, Session, SessionId, StopReason, StreamEvent, Verdict};
use floyd_llm::LlmClient;
use floyd_mcp::McpClientManager;
use floyd_storage::SessionStore;
use futures::{Stream, StreamExt};
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tracing::{debug, instrument, warn};

use crate::config::EngineConfig;
use crate::dispatch::{self, DispatchOutcome, PendingCall};
use crate::error::{EngineError, EngineResult};
use crate::event::{EngineEvent, PermissionResolution, ToolOutcome};
use crate::trim;

/// A marker appended as the final text of an assistant message sealed by
/// cancellation, so the session remains well-formed (§4.6, I5).
const CANCELLED_MARKER: &str = "[turn cancelled]";

/// An owned, boxed event stream — the concrete return type of `send_message`.
pub type EventStream = Pin<Box<dyn Stream<Item = EngineEvent> + Send>>;

/// Orchestrates a single conversation's tool-use loop.
///
/// Bound at construction to one [`LlmClient`], one [`McpClientManager`], one
/// [`PermissionManager`], one [`SessionStore`], and one [`Session`]. Per
/// §9's open question on concurrent sessions per engine, this type supports
/// exactly one in-flight turn at a time: a second `send_message` call while
/// one is in progress fails fast with [`EngineError::TurnInProgress`] rather
/// than queuing.
pub struct AgentEngine {
    llm: Arc<dyn LlmClient>,
    mcp: Arc<McpClientManager>,
    permissions: Arc<PermissionManager>,
    store: Arc<SessionStore>,
    session_id: SessionId,
    session: Arc<AsyncMutex<Session>>,
    turn_guard: Arc<AsyncMutex<()>>,
    config: EngineConfig,
}

impl AgentEngine {
    /// Bind an engine to its collaborators and an already-created (or
    /// loaded) session.
    #[must_use]
    pub fn new(
        llm: Arc<dyn LlmClient>,
        mcp: Arc<McpClientManager>,
        permissions: Arc<PermissionManager>,
        store: Arc<SessionStore>,
        session: Session,
        config: EngineConfig,
    ) -> Self {
        Self {
            llm,
            mcp,
            permissions,
            store,
            session_id: session.id,
            session: Arc::new(AsyncMutex::new(session)),
            turn_guard: Arc::new(AsyncMutex::new(())),
            config,
        }
    }

    /// The session this engine is bound to.
    #[must_use]
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// A read-only snapshot of the current history, for external (UI) consumption.
    pub async fn snapshot(&self) -> Session {
        self.session.lock().await.clone()
    }

    /// Run one turn: append `prompt`, stream from the LLM, dispatch any
    /// tool calls, and recurse until the model stops or `max_turns` is
    /// exhausted.
    ///
    /// Returns immediately with [`EngineError::TurnInProgress`] if another
    /// turn on this engine is already running, or [`EngineError::EmptyMessage`]
    /// for a zero-length prompt — both fail before any event is produced,
    /// matching "returns ... immediately rather than queuing". Otherwise
    /// returns the lazy event sequence described in the crate docs; the
    /// turn guard is held for as long as the caller keeps polling it.
    #[instrument(skip(self, cancel), fields(session = %self.session_id))]
    pub async fn send_message(&self, prompt: impl Into<String> + std::fmt::Debug, cancel: CancelToken) -> EngineResult<EventStream> {
        let prompt = prompt.into();
        if prompt.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        let guard = Arc::clone(&self.turn_guard)
            .try_lock_owned()
            .map_err(|_| EngineError::TurnInProgress)?;

        let llm = Arc::clone(&self.llm);
        let mcp = Arc::clone(&self.mcp);
        let permissions = Arc::clone(&self.permissions);
        let store = Arc::clone(&self.store);
        let session = Arc::clone(&self.session);
        let config = self.config.clone();

        Ok(Box::pin(stream! {
            let _guard = guard;

            {
                let mut session = session.lock().await;
                session.append(Message::user(prompt));
                if let Err(err) = store.save(&session).await {
                    warn!(error = %err, "failed to persist user message");
                    yield EngineEvent::Error { kind: ErrorKind::Storage, message: err.to_string() };
                    return;
                }
            }

            let mut turn = 0u32;
            'turns: loop {
                turn += 1;
                if turn > config.max_turns {
                    let mut session = session.lock().await;
                    session.append(Message::assistant_text(
                        "Stopped: the turn exceeded the maximum number of tool-use iterations.",
                    ));
                    let _ = store.save(&session).await;
                    yield EngineEvent::Error {
                        kind: ErrorKind::ExhaustedTurns,
                        message: format!("exceeded max_turns={}", config.max_turns),
                    };
                    return;
                }

                let (history, tools) = {
                    let mut session = session.lock().await;
                    trim::trim_history(
                        &mut session.messages,
                        config.trim_threshold_tokens,
                        config.min_retained_non_system,
                    );
                    (session.messages.clone(), mcp.list_tools().await)
                };

                let mut events = llm.stream(&history, &tools, cancel.clone()).await;

                let mut blocks: Vec<ContentBlock> = Vec::new();
                let mut pending_names: HashMap<String, String> = HashMap::new();
                let mut pending_calls: Vec<PendingCall> = Vec::new();
                let mut stop_reason: Option<StopReason> = None;
                let mut turn_error: Option<(ErrorKind, String)> = None;

                while let Some(event) = events.next().await {
                    match event {
                        StreamEvent::TextDelta(text) => {
                            push_text(&mut blocks, &text);
                            yield EngineEvent::Text(text);
                        }
                        StreamEvent::ToolCallBegin { id, name } => {
                            pending_names.insert(id, name);
                        }
                        StreamEvent::ToolCallArgsDelta { .. } => {}
                        StreamEvent::ToolCallEnd { id, args } => {
                            let name = pending_names.remove(&id).unwrap_or_else(|| {
                                warn!(id, "tool-call-end with no matching tool-call-begin");
                                "unknown".to_string()
                            });
                            blocks.push(ContentBlock::tool_use(id.clone(), name.clone(), args.clone()));
                            pending_calls.push(PendingCall { id, name, args });
                        }
                        StreamEvent::Usage { input, output } => {
                            debug!(input, output, "turn token usage");
                        }
                        StreamEvent::Stop(reason) => {
                            stop_reason = Some(reason);
                            break;
                        }
                        StreamEvent::Error { kind, message } => {
                            turn_error = Some((kind, message));
                            break;
                        }
                    }
                }

                if let Some((kind, message)) = turn_error {
                    blocks.push(ContentBlock::text(format!("[turn incomplete: {message}]")));
                    let mut session = session.lock().await;
                    session.append(Message::assistant(blocks));
                    let _ = store.save(&session).await;
                    yield EngineEvent::Error { kind, message };
                    return;
                }

                let Some(stop_reason) = stop_reason else {
                    blocks.push(ContentBlock::text("[turn incomplete: stream ended without a stop event]"));
                    let mut session = session.lock().await;
                    session.append(Message::assistant(blocks));
                    let _ = store.save(&session).await;
                    yield EngineEvent::Error {
                        kind: ErrorKind::Protocol,
                        message: "LLM stream ended without an explicit stop or error event".to_string(),
                    };
                    return;
                };

                match stop_reason {
                    StopReason::ToolUse => {
                        {
                            let mut session = session.lock().await;
                            session.append(Message::assistant(blocks));
                            if let Err(err) = store.save(&session).await {
                                yield EngineEvent::Error { kind: ErrorKind::Storage, message: err.to_string() };
                                return;
                            }
                        }

                        let mut allowed: Vec<PendingCall> = Vec::new();
                        let mut cancelled_during_asks = false;

                        for call in pending_calls {
                            if cancelled_during_asks {
                                let outcome = cancelled_tool_outcome();
                                record_tool_result(&session, &store, &call, &outcome).await;
                                yield EngineEvent::ToolFinished {
                                    id: call.id,
                                    name: call.name,
                                    output: to_event_outcome(&outcome),
                                };
                                continue;
                            }

                            let initial = permissions.check(&call.name);
                            let verdict = if initial == Verdict::Ask {
                                let (tx, rx) = oneshot::channel();
                                yield EngineEvent::PermissionRequired {
                                    id: call.id.clone(),
                                    tool_name: call.name.clone(),
                                    resolve: tx,
                                };
                                tokio::select! {
                                    biased;
                                    () = cancel.cancelled() => {
                                        cancelled_during_asks = true;
                                        Verdict::Deny
                                    }
                                    resolution = rx => resolve_verdict(&permissions, &call.name, resolution),
                                }
                            } else {
                                initial
                            };

                            if verdict == Verdict::Deny {
                                let outcome = if cancelled_during_asks {
                                    cancelled_tool_outcome()
                                } else {
                                    dispatch::permission_denied_outcome()
                                };
                                record_tool_result(&session, &store, &call, &outcome).await;
                                yield EngineEvent::ToolFinished {
                                    id: call.id,
                                    name: call.name,
                                    output: to_event_outcome(&outcome),
                                };
                                continue;
                            }

                            yield EngineEvent::ToolStarted { id: call.id.clone(), name: call.name.clone() };
                            allowed.push(call);
                        }

                        let handles: Vec<_> = allowed
                            .iter()
                            .map(|call| {
                                let mcp = Arc::clone(&mcp);
                                let args = dispatch::normalize_args(call.args.clone());
                                let name = call.name.clone();
                                let max_retries = config.max_retries;
                                let base_delay = config.retry_base_delay;
                                tokio::spawn(async move {
                                    dispatch::dispatch_with_retry(&mcp, &name, args, max_retries, base_delay).await
                                })
                            })
                            .collect();

                        let results = futures::future::join_all(handles).await;

                        for (call, joined) in allowed.into_iter().zip(results) {
                            let outcome = match joined {
                                Ok(outcome) => outcome,
                                Err(join_err) => DispatchOutcome {
                                    content: format!("tool task panicked: {join_err}"),
                                    is_error: true,
                                    kind: Some(ErrorKind::Tool),
                                },
                            };
                            record_tool_result(&session, &store, &call, &outcome).await;
                            yield EngineEvent::ToolFinished {
                                id: call.id,
                                name: call.name,
                                output: to_event_outcome(&outcome),
                            };
                        }

                        continue 'turns;
                    }
                    StopReason::Cancelled => {
                        blocks.push(ContentBlock::text(CANCELLED_MARKER));
                        let mut session = session.lock().await;
                        session.append(Message::assistant(blocks));
                        let _ = store.save(&session).await;
                        yield EngineEvent::Done;
                        return;
                    }
                    StopReason::End | StopReason::Length | StopReason::ContentFilter => {
                        let mut session = session.lock().await;
                        session.append(Message::assistant(blocks));
                        if let Err(err) = store.save(&session).await {
                            yield EngineEvent::Error { kind: ErrorKind::Storage, message: err.to_string() };
                            return;
                        }
                        drop(session);
                        yield EngineEvent::Done;
                        return;
                    }
                }
            }
        }))
    }
}

fn push_text(blocks: &mut Vec<ContentBlock>, text: &str) {
    if let Some(ContentBlock::Text { text: existing }) = blocks.last_mut() {
        existing.push_str(text);
    } else {
        blocks.push(ContentBlock::text(text.to_string()));
    }
}

fn resolve_verdict(
    permissions: &PermissionManager,
    tool_name: &str,
    resolution: Result<PermissionResolution, oneshot::error::RecvError>,
) -> Verdict {
    match resolution {
        Ok(resolution) => match dispatch::apply_resolution(permissions, tool_name, resolution) {
            Ok(true) => Verdict::Allow,
            Ok(false) => Verdict::Deny,
            Err(err) => {
                warn!(tool = tool_name, error = %err, "failed to persist permission resolution");
                Verdict::Deny
            }
        },
        Err(_) => Verdict::Deny,
    }
}

fn cancelled_tool_outcome() -> DispatchOutcome {
    DispatchOutcome {
        content: "the turn was cancelled before this tool call was authorized.".to_string(),
        is_error: true,
        kind: Some(ErrorKind::Cancelled),
    }
}

fn to_event_outcome(outcome: &DispatchOutcome) -> ToolOutcome {
    if outcome.is_error {
        ToolOutcome::Error {
            kind: outcome.kind.unwrap_or(ErrorKind::Tool),
            message: outcome.content.clone(),
        }
    } else {
        ToolOutcome::Success(outcome.content.clone())
    }
}

async fn record_tool_result(
    session: &Arc<AsyncMutex<Session>>,
    store: &Arc<SessionStore>,
    call: &PendingCall,
    outcome: &DispatchOutcome,
) {
    let mut session = session.lock().await;
    session.append(Message::tool_result(call.id.clone(), outcome.content.clone()));
    if let Err(err) = store.save(&session).await {
        warn!(tool = %call.name, error = %err, "failed to persist tool result");
    }
}

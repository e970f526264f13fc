//! End-to-end scenarios against a real `AgentEngine`, a scripted `LlmClient`,
//! and scripted MCP transports — no network, no subprocess.
//!
//! Each test is named after the scenario or invariant it seeds from the
//! agent runtime's testable-properties list (E1-E6, I1-I8).

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use floyd_approval::PermissionManager;
use floyd_core::{CancelToken, Message, PermissionRule, Role, StopReason, StreamEvent, ToolDescriptor, Verdict};
use floyd_mcp::McpClientManager;
use floyd_runtime::{AgentEngine, EngineConfig, EngineError, EngineEvent, PermissionResolution, ToolOutcome};
use floyd_storage::SessionStore;
use floyd_test::{ScriptedLlm, ScriptedTransport, ToolScript};
use futures::StreamExt;

async fn new_store() -> (tempfile::TempDir, Arc<SessionStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(SessionStore::new(dir.path()));
    (dir, store)
}

async fn system_only_session(store: &SessionStore) -> floyd_core::Session {
    let mut session = store.create(PathBuf::from("/work")).await.unwrap();
    session.append(Message::system("be a terse, helpful assistant."));
    store.save(&session).await.unwrap();
    session
}

fn engine_with(
    llm: ScriptedLlm,
    mcp: McpClientManager,
    permissions: PermissionManager,
    store: Arc<SessionStore>,
    session: floyd_core::Session,
) -> AgentEngine {
    AgentEngine::new(
        Arc::new(llm),
        Arc::new(mcp),
        Arc::new(permissions),
        store,
        session,
        EngineConfig::default().with_retry_policy(1, Duration::from_millis(1)),
    )
}

/// E1. Happy text turn.
#[tokio::test]
async fn e1_happy_text_turn() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;
    let session_id = session.id;

    let llm = ScriptedLlm::single_turn(vec![
        StreamEvent::TextDelta("Hi ".to_string()),
        StreamEvent::TextDelta("there.".to_string()),
        StreamEvent::Stop(StopReason::End),
    ]);
    let engine = engine_with(
        llm,
        McpClientManager::new(),
        PermissionManager::in_memory(vec![]).unwrap(),
        Arc::clone(&store),
        session,
    );

    let mut events = engine.send_message("Hello.", CancelToken::new()).await.unwrap();
    let mut texts = Vec::new();
    let mut saw_done = false;
    while let Some(event) = events.next().await {
        match event {
            EngineEvent::Text(t) => texts.push(t),
            EngineEvent::Done => {
                saw_done = true;
                break;
            }
            other => panic!("unexpected event in E1: {other:?}"),
        }
    }
    assert!(saw_done);
    assert_eq!(texts, vec!["Hi ".to_string(), "there.".to_string()]);

    let on_disk = store.load(session_id).await.unwrap();
    assert_eq!(on_disk.messages.len(), 3);
    assert_eq!(on_disk.messages[0].role, Role::System);
    assert_eq!(on_disk.messages[1].role, Role::User);
    assert_eq!(on_disk.messages[1].content.as_text(), "Hello.");
    assert_eq!(on_disk.messages[2].role, Role::Assistant);
    assert_eq!(on_disk.messages[2].content.as_text(), "Hi there.");
}

/// E2. One tool call, then a final text answer.
#[tokio::test]
async fn e2_one_tool_call() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;

    let llm = ScriptedLlm::new(vec![
        vec![
            StreamEvent::ToolCallBegin { id: "a".to_string(), name: "sum".to_string() },
            StreamEvent::ToolCallArgsDelta { id: "a".to_string(), fragment: "{\"x\":1,\"y\":2".to_string() },
            StreamEvent::ToolCallArgsDelta { id: "a".to_string(), fragment: "}".to_string() },
            StreamEvent::ToolCallEnd { id: "a".to_string(), args: serde_json::json!({"x": 1, "y": 2}) },
            StreamEvent::Stop(StopReason::ToolUse),
        ],
        vec![
            StreamEvent::TextDelta("3".to_string()),
            StreamEvent::Stop(StopReason::End),
        ],
    ]);

    let mcp = McpClientManager::new();
    let mut scripts = HashMap::new();
    scripts.insert("sum".to_string(), ToolScript::ok(serde_json::Value::String("3".to_string())));
    mcp.insert_client(
        "calc",
        Arc::new(ScriptedTransport::new(scripts)),
        vec![ToolDescriptor::new("sum", "adds two numbers")],
    )
    .await;

    let permissions = PermissionManager::in_memory(vec![PermissionRule::new("sum", Verdict::Allow)]).unwrap();
    let engine = engine_with(llm, mcp, permissions, Arc::clone(&store), session.clone());

    let mut events = engine.send_message("what is 1+2?", CancelToken::new()).await.unwrap();
    let mut seen = Vec::new();
    while let Some(event) = events.next().await {
        let done = matches!(event, EngineEvent::Done);
        seen.push(describe(&event));
        if done {
            break;
        }
    }
    assert_eq!(
        seen,
        vec![
            "tool-started:a:sum".to_string(),
            "tool-finished:a:sum:3".to_string(),
            "text:3".to_string(),
            "done".to_string(),
        ]
    );

    let final_session = store.load(session.id).await.unwrap();
    assert_eq!(final_session.messages.len(), 5); // system, user, assistant(tool_use), tool, assistant
    assert!(final_session.messages[2].has_tool_calls());
    assert_eq!(final_session.messages[3].role, Role::Tool);
    assert_eq!(final_session.messages[3].tool_use_id.as_deref(), Some("a"));
    assert_eq!(final_session.messages[3].content.as_text(), "3");
    assert_eq!(final_session.messages[4].content.as_text(), "3");
}

fn describe(event: &EngineEvent) -> String {
    match event {
        EngineEvent::Text(t) => format!("text:{t}"),
        EngineEvent::ToolStarted { id, name } => format!("tool-started:{id}:{name}"),
        EngineEvent::ToolFinished { id, name, output } => match output {
            ToolOutcome::Success(text) => format!("tool-finished:{id}:{name}:{text}"),
            ToolOutcome::Error { message, .. } => format!("tool-error:{id}:{name}:{message}"),
        },
        EngineEvent::PermissionRequired { id, tool_name, .. } => format!("ask:{id}:{tool_name}"),
        EngineEvent::Error { kind, message } => format!("error:{kind:?}:{message}"),
        EngineEvent::Done => "done".to_string(),
    }
}

/// E3. Parallel tools: `b` finishes first, but the caller observes
/// `toolFinished` in declaration order (`a` before `b`).
#[tokio::test]
async fn e3_parallel_tools_preserve_declaration_order() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;

    let llm = ScriptedLlm::new(vec![
        vec![
            StreamEvent::ToolCallBegin { id: "a".to_string(), name: "slow".to_string() },
            StreamEvent::ToolCallEnd { id: "a".to_string(), args: serde_json::json!({}) },
            StreamEvent::ToolCallBegin { id: "b".to_string(), name: "fast".to_string() },
            StreamEvent::ToolCallEnd { id: "b".to_string(), args: serde_json::json!({}) },
            StreamEvent::Stop(StopReason::ToolUse),
        ],
        vec![
            StreamEvent::TextDelta("done".to_string()),
            StreamEvent::Stop(StopReason::End),
        ],
    ]);

    let mcp = McpClientManager::new();
    let mut scripts = HashMap::new();
    scripts.insert(
        "slow".to_string(),
        ToolScript::ok(serde_json::json!("slow-result")).with_delay(Duration::from_millis(40)),
    );
    scripts.insert(
        "fast".to_string(),
        ToolScript::ok(serde_json::json!("fast-result")).with_delay(Duration::from_millis(1)),
    );
    mcp.insert_client(
        "srv",
        Arc::new(ScriptedTransport::new(scripts)),
        vec![ToolDescriptor::new("slow", "slow tool"), ToolDescriptor::new("fast", "fast tool")],
    )
    .await;

    let permissions = PermissionManager::in_memory(vec![PermissionRule::new("*", Verdict::Allow)]).unwrap();
    let engine = engine_with(llm, mcp, permissions, Arc::clone(&store), session);

    let mut events = engine.send_message("run both", CancelToken::new()).await.unwrap();
    let mut finished_order = Vec::new();
    while let Some(event) = events.next().await {
        if let EngineEvent::ToolFinished { id, .. } = &event {
            finished_order.push(id.clone());
        }
        if matches!(event, EngineEvent::Done) {
            break;
        }
    }
    assert_eq!(finished_order, vec!["a".to_string(), "b".to_string()]);
}

/// E4. A tool under `ask` policy pauses; `approve once` lets that one call
/// through, and an identical tool later in the same turn asks again.
#[tokio::test]
async fn e4_permission_ask_is_once_per_call() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;

    let llm = ScriptedLlm::new(vec![
        vec![
            StreamEvent::ToolCallBegin { id: "a".to_string(), name: "shell".to_string() },
            StreamEvent::ToolCallEnd { id: "a".to_string(), args: serde_json::json!({"cmd": "ls"}) },
            StreamEvent::ToolCallBegin { id: "b".to_string(), name: "shell".to_string() },
            StreamEvent::ToolCallEnd { id: "b".to_string(), args: serde_json::json!({"cmd": "pwd"}) },
            StreamEvent::Stop(StopReason::ToolUse),
        ],
        vec![StreamEvent::TextDelta("ok".to_string()), StreamEvent::Stop(StopReason::End)],
    ]);

    let mcp = McpClientManager::new();
    let mut scripts = HashMap::new();
    scripts.insert("shell".to_string(), ToolScript::ok(serde_json::json!("output")));
    mcp.insert_client(
        "srv",
        Arc::new(ScriptedTransport::new(scripts)),
        vec![ToolDescriptor::new("shell", "run a shell command")],
    )
    .await;

    // No rule for "shell" -> default verdict is `ask`.
    let permissions = PermissionManager::in_memory(vec![]).unwrap();
    let engine = engine_with(llm, mcp, permissions, Arc::clone(&store), session);

    let mut events = engine.send_message("run two commands", CancelToken::new()).await.unwrap();
    let mut asks = 0;
    let mut finished = Vec::new();
    while let Some(event) = events.next().await {
        match event {
            EngineEvent::PermissionRequired { resolve, .. } => {
                asks += 1;
                resolve.send(PermissionResolution::ApproveOnce).unwrap();
            }
            EngineEvent::ToolFinished { id, .. } => finished.push(id),
            EngineEvent::Done => break,
            _ => {}
        }
    }
    assert_eq!(asks, 2, "each shell call in the same turn asks independently");
    assert_eq!(finished, vec!["a".to_string(), "b".to_string()]);
}

/// E5. A tool call whose arguments never parsed (empty object) still
/// dispatches and the turn completes without exception.
#[tokio::test]
async fn e5_malformed_tool_arguments_do_not_crash_the_turn() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;

    let llm = ScriptedLlm::new(vec![
        vec![
            StreamEvent::ToolCallBegin { id: "a".to_string(), name: "echo".to_string() },
            // The adapter gave up on the partial JSON and handed back `{}`.
            StreamEvent::ToolCallEnd { id: "a".to_string(), args: serde_json::json!({}) },
            StreamEvent::Stop(StopReason::ToolUse),
        ],
        vec![StreamEvent::TextDelta("fine".to_string()), StreamEvent::Stop(StopReason::End)],
    ]);

    let mcp = McpClientManager::new();
    let mut scripts = HashMap::new();
    scripts.insert("echo".to_string(), ToolScript::ok(serde_json::json!("")));
    mcp.insert_client(
        "srv",
        Arc::new(ScriptedTransport::new(scripts)),
        vec![ToolDescriptor::new("echo", "echoes input")],
    )
    .await;

    let permissions = PermissionManager::in_memory(vec![PermissionRule::new("*", Verdict::Allow)]).unwrap();
    let engine = engine_with(llm, mcp, permissions, Arc::clone(&store), session);

    let mut events = engine.send_message("echo something", CancelToken::new()).await.unwrap();
    let mut saw_done = false;
    while let Some(event) = events.next().await {
        if let EngineEvent::Error { .. } = event {
            panic!("turn should complete without an error event");
        }
        if matches!(event, EngineEvent::Done) {
            saw_done = true;
        }
    }
    assert!(saw_done);
}

/// E6. Cancellation mid-stream: after 3 text deltas, the caller cancels.
#[tokio::test]
async fn e6_cancellation_mid_stream_seals_a_partial_message() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;
    let session_id = session.id;

    let llm = ScriptedLlm::single_turn(vec![
        StreamEvent::TextDelta("one ".to_string()),
        StreamEvent::TextDelta("two ".to_string()),
        StreamEvent::TextDelta("three ".to_string()),
        StreamEvent::TextDelta("four ".to_string()),
        StreamEvent::Stop(StopReason::End),
    ]);
    let engine = engine_with(
        llm,
        McpClientManager::new(),
        PermissionManager::in_memory(vec![]).unwrap(),
        Arc::clone(&store),
        session,
    );

    let cancel = CancelToken::new();
    let mut events = engine.send_message("tell me a long story", cancel.clone()).await.unwrap();

    let mut received = Vec::new();
    while let Some(event) = events.next().await {
        match event {
            EngineEvent::Text(t) => {
                received.push(t);
                if received.len() == 3 {
                    cancel.cancel();
                }
            }
            EngineEvent::Done => break,
            other => panic!("unexpected event in E6: {other:?}"),
        }
    }
    assert_eq!(received, vec!["one ".to_string(), "two ".to_string(), "three ".to_string()]);

    let on_disk = store.load(session_id).await.unwrap();
    let assistant = on_disk.messages.last().unwrap();
    assert_eq!(assistant.role, Role::Assistant);
    let text = assistant.content.as_text();
    assert!(text.contains("one two three "), "got: {text:?}");
    assert!(text.contains("[turn cancelled]"), "got: {text:?}");
}

/// I5. A cancel token fired before the first event yields exactly one
/// `Done`, no `Text`, and an explicitly-cancelled assistant message.
#[tokio::test]
async fn i5_cancel_before_first_event() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;
    let session_id = session.id;

    let llm = ScriptedLlm::single_turn(vec![
        StreamEvent::TextDelta("should never be seen".to_string()),
        StreamEvent::Stop(StopReason::End),
    ]);
    let engine = engine_with(
        llm,
        McpClientManager::new(),
        PermissionManager::in_memory(vec![]).unwrap(),
        Arc::clone(&store),
        session,
    );

    let cancel = CancelToken::new();
    cancel.cancel();
    let mut events = engine.send_message("hello", cancel).await.unwrap();

    let mut all = Vec::new();
    while let Some(event) = events.next().await {
        all.push(describe(&event));
    }
    assert_eq!(all, vec!["done".to_string()]);

    let on_disk = store.load(session_id).await.unwrap();
    assert_eq!(on_disk.messages.len(), 3); // system, user, cancelled-assistant
    assert_eq!(on_disk.messages[1].role, Role::User);
    assert_eq!(on_disk.messages[2].content.as_text(), "[turn cancelled]");
}

/// A zero-length user message is rejected before any event is produced.
#[tokio::test]
async fn boundary_empty_message_is_rejected() {
    let (_dir, store) = new_store().await;
    let session = system_only_session(&store).await;
    let engine = engine_with(
        ScriptedLlm::new(vec![]),
        McpClientManager::new(),
        PermissionManager::in_memory(vec![]).unwrap(),
        store,
        session,
    );
    let err = engine.send_message("", CancelToken::new()).await.unwrap_err();
    assert!(matches!(err, EngineError::EmptyMessage));
}

/// I7. `listTools` aggregates across clients and resolves name collisions
/// first-registered-wins, recording a diagnostic for the shadowed one.
#[tokio::test]
async fn i7_tool_name_collisions_resolve_first_registered_wins() {
    let mcp = McpClientManager::new();
    mcp.insert_client(
        "alpha",
        Arc::new(ScriptedTransport::new(HashMap::new())),
        vec![ToolDescriptor::new("search", "alpha's search")],
    )
    .await;
    mcp.insert_client(
        "beta",
        Arc::new(ScriptedTransport::new(HashMap::new())),
        vec![ToolDescriptor::new("search", "beta's search"), ToolDescriptor::new("fetch", "beta's fetch")],
    )
    .await;

    let tools = mcp.list_tools().await;
    assert_eq!(tools.len(), 2);
    let search = tools.iter().find(|t| t.name == "search").unwrap();
    assert_eq!(search.description, "alpha's search");

    let collisions = mcp.collisions().await;
    assert_eq!(collisions.len(), 1);
    assert_eq!(collisions[0].name, "search");
    assert_eq!(collisions[0].kept_server, "alpha");
    assert_eq!(collisions[0].shadowed_server, "beta");
}

/// I4. The system message survives trimming even under a near-zero token
/// budget, and at least the configured minimum non-system messages remain.
#[tokio::test]
async fn i4_system_message_survives_aggressive_trimming() {
    let (_dir, store) = new_store().await;
    let mut session = system_only_session(&store).await;
    for i in 0..20 {
        session.append(Message::user(format!("filler message number {i} with some extra padding text")));
        session.append(Message::assistant_text(format!("ack {i}")));
    }
    store.save(&session).await.unwrap();

    let llm = ScriptedLlm::single_turn(vec![
        StreamEvent::TextDelta("ok".to_string()),
        StreamEvent::Stop(StopReason::End),
    ]);
    let config = EngineConfig::default().with_trim_threshold_tokens(10).with_max_turns(5);
    let engine = AgentEngine::new(
        Arc::new(llm),
        Arc::new(McpClientManager::new()),
        Arc::new(PermissionManager::in_memory(vec![]).unwrap()),
        Arc::clone(&store),
        session.clone(),
        config,
    );

    let mut events = engine.send_message("one more", CancelToken::new()).await.unwrap();
    while events.next().await.is_some() {}

    let snapshot = engine.snapshot().await;
    assert_eq!(snapshot.messages[0].role, Role::System);
    let non_system = snapshot.messages.iter().filter(|m| m.role != Role::System).count();
    assert!(non_system >= 2, "trimming must leave at least the minimum retained pair");
}

//! The OpenAI-shaped adapter: `POST /chat/completions` with SSE streaming.
//!
//! Used for any provider exposing the OpenAI schema — OpenAI itself, the
//! GLM endpoint at `api.z.ai`, and `DeepSeek`. Tool call argument fragments
//! arrive keyed by integer `index`, not by id, until the server assigns an
//! id on the first delta for that index.

use std::collections::HashMap;

use async_stream::stream;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use floyd_core::{
    message::{ContentBlock, MessageContent, Role},
    CancelToken, ErrorKind, Message, StopReason, StreamEvent, ToolDescriptor,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::client::{LlmClient, StreamBox};

/// An OpenAI-compatible chat-completions endpoint.
pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl OpenAiCompatClient {
    /// Build a client against `base_url` using `model`, authenticating with
    /// `api_key` via a bearer `Authorization` header.
    #[must_use]
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, max_tokens: u32, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            model: model.into(),
            max_tokens,
            api_key: api_key.into(),
        }
    }

    fn request_body(&self, history: &[Message], tools: &[ToolDescriptor]) -> Value {
        let mut messages = Vec::with_capacity(history.len());
        for message in history {
            messages.push(convert_message(message));
        }

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": self.max_tokens,
            "stream": true,
        });

        if !tools.is_empty() {
            let functions: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    serde_json::json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.input_schema,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(functions);
        }

        body
    }
}

fn convert_message(message: &Message) -> Value {
    if message.role == Role::Tool {
        return serde_json::json!({
            "role": "tool",
            "tool_call_id": message.tool_use_id,
            "content": message.content.as_text(),
        });
    }

    let role = match message.role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => unreachable!("handled above"),
    };

    match &message.content {
        MessageContent::Text(text) => serde_json::json!({"role": role, "content": text}),
        MessageContent::Blocks(blocks) => {
            let tool_calls: Vec<Value> = blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolUse { id, name, input } => Some(serde_json::json!({
                        "id": id,
                        "type": "function",
                        "function": {
                            "name": name,
                            "arguments": input.to_string(),
                        }
                    })),
                    _ => None,
                })
                .collect();
            let text = message.content.as_text();

            if tool_calls.is_empty() {
                serde_json::json!({"role": role, "content": text})
            } else {
                serde_json::json!({"role": "assistant", "content": Value::Null, "tool_calls": tool_calls})
            }
        }
    }
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name_emitted: bool,
    args_buffer: String,
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn stream(
        &self,
        history: &[Message],
        tools: &[ToolDescriptor],
        cancel: CancelToken,
    ) -> StreamBox {
        if cancel.is_cancelled() {
            return Box::pin(stream! { yield StreamEvent::Stop(StopReason::Cancelled); });
        }

        let body = self.request_body(history, tools);
        let request = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send();

        Box::pin(stream! {
            let response = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    yield StreamEvent::Stop(StopReason::Cancelled);
                    return;
                }
                result = request => result,
            };

            let response = match response {
                Ok(response) => response,
                Err(err) => {
                    yield StreamEvent::Error { kind: ErrorKind::Transport, message: err.to_string() };
                    return;
                }
            };

            if !response.status().is_success() {
                let status = response.status().as_u16();
                let body = response.text().await.unwrap_or_default();
                yield StreamEvent::Error {
                    kind: ErrorKind::Transport,
                    message: format!("HTTP {status}: {body}"),
                };
                return;
            }

            let mut events = response.bytes_stream().eventsource();
            let mut pending: HashMap<usize, PendingToolCall> = HashMap::new();
            let mut order: Vec<usize> = Vec::new();
            let mut stopped = false;

            loop {
                let next = tokio::select! {
                    biased;
                    () = cancel.cancelled() => {
                        for index in &order {
                            if let Some(call) = pending.remove(index) {
                                yield tool_call_end(&call);
                            }
                        }
                        yield StreamEvent::Stop(StopReason::Cancelled);
                        return;
                    }
                    next = events.next() => next,
                };

                let Some(event) = next else { break };
                let event = match event {
                    Ok(event) => event,
                    Err(err) => {
                        yield StreamEvent::Error { kind: ErrorKind::Transport, message: err.to_string() };
                        return;
                    }
                };

                if event.data == "[DONE]" {
                    break;
                }

                let parsed: Result<ChunkEvent, _> = serde_json::from_str(&event.data);
                let Ok(chunk) = parsed else {
                    warn!(data = %event.data, "skipping malformed OpenAI-shaped stream chunk");
                    continue;
                };

                let Some(choice) = chunk.choices.into_iter().next() else { continue };

                if let Some(content) = choice.delta.content {
                    if !content.is_empty() {
                        yield StreamEvent::TextDelta(content);
                    }
                }

                if let Some(deltas) = choice.delta.tool_calls {
                    for delta in deltas {
                        let entry = pending.entry(delta.index).or_insert_with(|| {
                            order.push(delta.index);
                            PendingToolCall {
                                id: delta.id.clone().unwrap_or_else(|| format!("call_{}", delta.index)),
                                name_emitted: false,
                                args_buffer: String::new(),
                            }
                        });
                        if let Some(id) = delta.id {
                            entry.id = id;
                        }
                        if let Some(function) = delta.function {
                            if !entry.name_emitted {
                                if let Some(name) = function.name {
                                    entry.name_emitted = true;
                                    yield StreamEvent::ToolCallBegin { id: entry.id.clone(), name };
                                }
                            }
                            if let Some(fragment) = function.arguments {
                                entry.args_buffer.push_str(&fragment);
                                yield StreamEvent::ToolCallArgsDelta { id: entry.id.clone(), fragment };
                            }
                        }
                    }
                }

                if let Some(usage) = chunk.usage {
                    yield StreamEvent::Usage { input: usage.prompt_tokens, output: usage.completion_tokens };
                }

                if let Some(reason) = choice.finish_reason {
                    for index in &order {
                        if let Some(call) = pending.remove(index) {
                            yield tool_call_end(&call);
                        }
                    }
                    order.clear();
                    yield StreamEvent::Stop(stop_reason(&reason));
                    stopped = true;
                    break;
                }
            }

            if !stopped {
                for index in &order {
                    if let Some(call) = pending.remove(index) {
                        yield tool_call_end(&call);
                    }
                }
                yield StreamEvent::Stop(StopReason::End);
            }
        })
    }
}

fn tool_call_end(call: &PendingToolCall) -> StreamEvent {
    let args = serde_json::from_str(&call.args_buffer).unwrap_or_else(|_| {
        warn!(id = %call.id, "tool call arguments did not parse as JSON; using empty object");
        serde_json::json!({})
    });
    StreamEvent::ToolCallEnd { id: call.id.clone(), args }
}

fn stop_reason(reason: &str) -> StopReason {
    match reason {
        "tool_calls" => StopReason::ToolUse,
        "length" => StopReason::Length,
        "content_filter" => StopReason::ContentFilter,
        _ => StopReason::End,
    }
}

#[derive(Debug, Deserialize)]
struct ChunkEvent {
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCallDelta {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn convert_user_message_is_plain_text() {
        let msg = Message::user("hi");
        let converted = convert_message(&msg);
        assert_eq!(converted["role"], "user");
        assert_eq!(converted["content"], "hi");
    }

    #[test]
    fn convert_tool_result_message_uses_tool_role() {
        let msg = Message::tool_result("call-1", "42");
        let converted = convert_message(&msg);
        assert_eq!(converted["role"], "tool");
        assert_eq!(converted["tool_call_id"], "call-1");
        assert_eq!(converted["content"], "42");
    }

    #[test]
    fn convert_assistant_text_message_has_no_tool_calls_field() {
        let msg = Message::assistant_text("hello there");
        let converted = convert_message(&msg);
        assert_eq!(converted["role"], "assistant");
        assert_eq!(converted["content"], "hello there");
        assert!(converted.get("tool_calls").is_none());
    }

    #[test]
    fn convert_assistant_tool_use_emits_tool_calls_array() {
        let msg = Message::assistant(vec![ContentBlock::tool_use(
            "a",
            "sum",
            serde_json::json!({"x": 1}),
        )]);
        let converted = convert_message(&msg);
        assert_eq!(converted["tool_calls"][0]["id"], "a");
        assert_eq!(converted["tool_calls"][0]["function"]["name"], "sum");
    }

    #[test]
    fn finish_reason_maps_to_stop_reason() {
        assert_eq!(stop_reason("stop"), StopReason::End);
        assert_eq!(stop_reason("tool_calls"), StopReason::ToolUse);
        assert_eq!(stop_reason("length"), StopReason::Length);
        assert_eq!(stop_reason("content_filter"), StopReason::ContentFilter);
    }

    #[test]
    fn tool_call_end_falls_back_to_empty_object_on_bad_json() {
        let call = PendingToolCall {
            id: "a".to_string(),
            name_emitted: true,
            args_buffer: "{not json".to_string(),
        };
        let event = tool_call_end(&call);
        match event {
            StreamEvent::ToolCallEnd { args, .. } => assert_eq!(args, serde_json::json!({})),
            _ => panic!("expected ToolCallEnd"),
        }
    }
}

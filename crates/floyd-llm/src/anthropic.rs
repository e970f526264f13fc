//! The Anthropic-shaped adapter: `POST /messages` with named SSE events.
//!
//! Unlike the OpenAI-shaped wire format, Anthropic frames each SSE event
//! with an explicit `event:` name and keys tool call argument fragments by
//! content-block index rather than by id, so a block's id and name are
//! both known up front from `content_block_start`.

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

/// An Anthropic `messages`-endpoint client.
pub struct AnthropicClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    api_key: String,
}

impl AnthropicClient {
    /// Build a client against `base_url` using `model`, authenticating with
    /// `api_key` via the `x-api-key` header.
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
        let system = history
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_text());

        let messages: Vec<Value> = history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(convert_message)
            .collect();

        let mut body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": messages,
            "stream": true,
        });

        if let Some(system) = system {
            body["system"] = Value::String(system);
        }

        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(|tool| {
                    serde_json::json!({
                        "name": tool.name,
                        "description": tool.description,
                        "input_schema": tool.input_schema,
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }

        body
    }
}

fn convert_message(message: &Message) -> Value {
    if message.role == Role::Tool {
        return serde_json::json!({
            "role": "user",
            "content": [{
                "type": "tool_result",
                "tool_use_id": message.tool_use_id,
                "content": message.content.as_text(),
            }],
        });
    }

    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System | Role::Tool => unreachable!("handled above"),
    };

    match &message.content {
        MessageContent::Text(text) => serde_json::json!({"role": role, "content": text}),
        MessageContent::Blocks(blocks) => {
            let content: Vec<Value> = blocks
                .iter()
                .map(|block| match block {
                    ContentBlock::Text { text } => serde_json::json!({"type": "text", "text": text}),
                    ContentBlock::ToolUse { id, name, input } => serde_json::json!({
                        "type": "tool_use",
                        "id": id,
                        "name": name,
                        "input": input,
                    }),
                    ContentBlock::ToolResult { tool_use_id, content, is_error } => serde_json::json!({
                        "type": "tool_result",
                        "tool_use_id": tool_use_id,
                        "content": content,
                        "is_error": is_error,
                    }),
                })
                .collect();
            serde_json::json!({"role": role, "content": content})
        }
    }
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    args_buffer: String,
}

#[async_trait]
impl LlmClient for AnthropicClient {
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
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
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
            // Indexed by content-block index; only tool_use blocks get an entry.
            let mut pending: std::collections::HashMap<u32, PendingToolCall> = std::collections::HashMap::new();
            let mut order: Vec<u32> = Vec::new();

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

                if event.data.trim().is_empty() {
                    continue;
                }

                let parsed: Result<AnthropicEvent, _> = serde_json::from_str(&event.data);
                let Ok(parsed) = parsed else {
                    warn!(data = %event.data, "skipping malformed Anthropic-shaped stream event");
                    continue;
                };

                match parsed {
                    AnthropicEvent::ContentBlockStart { index, content_block } => {
                        if let BlockStart::ToolUse { id, name } = content_block {
                            order.push(index);
                            pending.insert(index, PendingToolCall { id: id.clone(), args_buffer: String::new() });
                            yield StreamEvent::ToolCallBegin { id, name };
                        }
                    }
                    AnthropicEvent::ContentBlockDelta { index, delta } => match delta {
                        BlockDelta::TextDelta { text } => {
                            if !text.is_empty() {
                                yield StreamEvent::TextDelta(text);
                            }
                        }
                        BlockDelta::InputJsonDelta { partial_json } => {
                            if let Some(call) = pending.get_mut(&index) {
                                call.args_buffer.push_str(&partial_json);
                                yield StreamEvent::ToolCallArgsDelta { id: call.id.clone(), fragment: partial_json };
                            }
                        }
                    },
                    AnthropicEvent::ContentBlockStop { index } => {
                        if let Some(call) = pending.remove(&index) {
                            yield tool_call_end(&call);
                        }
                    }
                    AnthropicEvent::MessageDelta { delta, usage } => {
                        if let Some(usage) = usage {
                            yield StreamEvent::Usage { input: 0, output: usage.output_tokens };
                        }
                        if let Some(reason) = delta.stop_reason {
                            for index in &order {
                                if let Some(call) = pending.remove(index) {
                                    yield tool_call_end(&call);
                                }
                            }
                            yield StreamEvent::Stop(stop_reason(&reason));
                            return;
                        }
                    }
                    AnthropicEvent::MessageStop => {
                        yield StreamEvent::Stop(StopReason::End);
                        return;
                    }
                    AnthropicEvent::Error { error } => {
                        yield StreamEvent::Error { kind: ErrorKind::Protocol, message: error.message };
                        return;
                    }
                    AnthropicEvent::Other => {}
                }
            }

            yield StreamEvent::Stop(StopReason::End);
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
        "tool_use" => StopReason::ToolUse,
        "max_tokens" => StopReason::Length,
        _ => StopReason::End,
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicEvent {
    ContentBlockStart {
        index: u32,
        content_block: BlockStart,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: MessageDeltaInner,
        #[serde(default)]
        usage: Option<DeltaUsage>,
    },
    MessageStop,
    Error {
        error: AnthropicApiError,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockStart {
    Text {
        #[serde(default)]
        #[allow(dead_code)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct MessageDeltaInner {
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicApiError {
    message: String,
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
    fn convert_tool_result_wraps_in_user_content_block() {
        let msg = Message::tool_result("call-1", "42");
        let converted = convert_message(&msg);
        assert_eq!(converted["role"], "user");
        assert_eq!(converted["content"][0]["type"], "tool_result");
        assert_eq!(converted["content"][0]["tool_use_id"], "call-1");
    }

    #[test]
    fn system_message_is_extracted_not_duplicated_in_messages() {
        let client = AnthropicClient::new("https://api.anthropic.com/v1", "claude-sonnet-4-5", 4096, "key");
        let history = vec![Message::system("be nice"), Message::user("hi")];
        let body = client.request_body(&history, &[]);
        assert_eq!(body["system"], "be nice");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn stop_reason_maps_tool_use_and_max_tokens() {
        assert_eq!(stop_reason("tool_use"), StopReason::ToolUse);
        assert_eq!(stop_reason("max_tokens"), StopReason::Length);
        assert_eq!(stop_reason("end_turn"), StopReason::End);
    }

    #[test]
    fn tool_call_end_falls_back_to_empty_object_on_bad_json() {
        let call = PendingToolCall { id: "a".to_string(), args_buffer: "not json".to_string() };
        let event = tool_call_end(&call);
        match event {
            StreamEvent::ToolCallEnd { args, .. } => assert_eq!(args, serde_json::json!({})),
            _ => panic!("expected ToolCallEnd"),
        }
    }
}

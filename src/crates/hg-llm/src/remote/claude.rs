//! Anthropic Claude client implementation.
//!
//! Implements both the single-shot [`crate::ChatModel::chat`] call used by
//! the judges and Auto Mode, and the token-by-token [`crate::ChatModel::stream`]
//! call used by the orchestrator's chat loop, including interleaved tool
//! calls surfaced as complete `ToolUseStart` events once their streamed
//! JSON arguments finish accumulating.

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::message::{Message, Role, ToolCall, ToolDefinition};
use crate::request::{ChatRequest, ChatResponse, StreamEvent, UsageMetadata};
use crate::traits::ChatModel;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Claude API client.
#[derive(Clone)]
pub struct ClaudeClient {
    config: RemoteLlmConfig,
    http: Client,
}

impl ClaudeClient {
    pub fn new(config: RemoteLlmConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build reqwest client");
        Self { config, http }
    }

    fn convert_messages(&self, messages: &[Message]) -> (Option<String>, Vec<ClaudeMessage>) {
        let mut system = None;
        let mut out = Vec::new();

        for msg in messages {
            match msg.role {
                Role::System => {
                    system = Some(match system {
                        Some(existing) => format!("{existing}\n\n{}", msg.text),
                        None => msg.text.clone(),
                    });
                }
                Role::User => out.push(ClaudeMessage {
                    role: "user".to_string(),
                    content: vec![ClaudeContent::Text {
                        text: msg.text.clone(),
                    }],
                }),
                Role::Assistant => {
                    let mut blocks = Vec::new();
                    if !msg.text.is_empty() {
                        blocks.push(ClaudeContent::Text {
                            text: msg.text.clone(),
                        });
                    }
                    for call in &msg.tool_calls {
                        blocks.push(ClaudeContent::ToolUse {
                            id: call.id.clone(),
                            name: call.name.clone(),
                            input: call.arguments.clone(),
                        });
                    }
                    out.push(ClaudeMessage {
                        role: "assistant".to_string(),
                        content: blocks,
                    });
                }
                Role::Tool => {
                    let blocks = msg
                        .tool_results
                        .iter()
                        .map(|r| ClaudeContent::ToolResult {
                            tool_use_id: r.tool_call_id.clone(),
                            content: r.content.to_string(),
                            is_error: r.is_error,
                        })
                        .collect();
                    out.push(ClaudeMessage {
                        role: "user".to_string(),
                        content: blocks,
                    });
                }
            }
        }

        (system, out)
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<ClaudeTool> {
        tools
            .iter()
            .map(|t| ClaudeTool {
                name: t.name.clone(),
                description: t.description.clone(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> ClaudeRequest {
        let (system, messages) = self.convert_messages(&request.messages);
        ClaudeRequest {
            model: self.config.model.clone(),
            messages,
            system,
            max_tokens: request.max_tokens.unwrap_or(4096),
            temperature: request.temperature,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(Self::convert_tools(&request.tools))
            },
            stream,
        }
    }

    fn map_http_error(status: reqwest::StatusCode, body: &str) -> LlmError {
        match status.as_u16() {
            401 => LlmError::AuthenticationError(body.to_string()),
            429 => LlmError::RateLimitExceeded(body.to_string()),
            _ => LlmError::ProviderError(format!("Claude API error {status}: {body}")),
        }
    }
}

#[async_trait]
impl ChatModel for ClaudeClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = self.build_request(&request, false);
        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &text));
        }

        let parsed: ClaudeResponse = response.json().await?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in parsed.content {
            match block {
                ClaudeContent::Text { text: t } => text.push_str(&t),
                ClaudeContent::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                    id,
                    name,
                    arguments: input,
                }),
                ClaudeContent::ToolResult { .. } => {}
            }
        }

        let message = if tool_calls.is_empty() {
            Message::assistant(text)
        } else {
            Message {
                role: Role::Assistant,
                text,
                tool_calls,
                tool_results: Vec::new(),
            }
        };

        Ok(ChatResponse {
            message,
            usage: UsageMetadata::new(parsed.usage.input_tokens, parsed.usage.output_tokens),
            stop_reason: parsed.stop_reason,
        })
    }

    async fn stream(&self, request: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let body = self.build_request(&request, true);

        let response = self
            .http
            .post(format!("{}/v1/messages", self.config.base_url))
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &text));
        }

        let raw_events = response.bytes_stream().eventsource();

        // Anthropic delivers tool-call arguments as incremental JSON deltas
        // across a `content_block_start`/`content_block_delta*`/`content_block_stop`
        // triple; we buffer them here and only emit `ToolUseStart` once the
        // block closes and the JSON is known to be complete and parseable.
        let mut pending_tool: Option<(String, String, String)> = None;

        let translated = raw_events.filter_map(move |raw| {
            let event = match raw {
                Ok(e) => e,
                Err(e) => return futures::future::ready(Some(Err(LlmError::ProviderError(e.to_string())))),
            };
            if event.data == "[DONE]" || event.data.is_empty() {
                return futures::future::ready(None);
            }
            let parsed: ClaudeStreamEvent = match serde_json::from_str(&event.data) {
                Ok(v) => v,
                Err(e) => return futures::future::ready(Some(Err(LlmError::InvalidResponse(e.to_string())))),
            };

            let out = match parsed {
                ClaudeStreamEvent::ContentBlockStart { content_block, .. } => match content_block {
                    ClaudeStreamBlock::ToolUse { id, name } => {
                        pending_tool = Some((id, name, String::new()));
                        None
                    }
                    ClaudeStreamBlock::Text { .. } => None,
                },
                ClaudeStreamEvent::ContentBlockDelta { delta, .. } => match delta {
                    ClaudeStreamDelta::TextDelta { text } => Some(StreamEvent::TextDelta { delta: text }),
                    ClaudeStreamDelta::InputJsonDelta { partial_json } => {
                        if let Some((_, _, buf)) = pending_tool.as_mut() {
                            buf.push_str(&partial_json);
                        }
                        None
                    }
                },
                ClaudeStreamEvent::ContentBlockStop { .. } => {
                    pending_tool.take().map(|(id, name, json)| {
                        let arguments = if json.is_empty() {
                            serde_json::json!({})
                        } else {
                            serde_json::from_str(&json).unwrap_or_else(|e| {
                                serde_json::json!({"error": format!("unparseable tool arguments: {e}"), "raw": json})
                            })
                        };
                        StreamEvent::ToolUseStart { id, name, arguments }
                    })
                }
                ClaudeStreamEvent::MessageDelta { delta, usage } => Some(StreamEvent::Stop {
                    usage: UsageMetadata::new(usage.input_tokens, usage.output_tokens),
                    stop_reason: delta.stop_reason,
                }),
                ClaudeStreamEvent::MessageStart { .. } | ClaudeStreamEvent::MessageStop | ClaudeStreamEvent::Unknown => None,
            };

            futures::future::ready(out.map(Ok))
        });

        Ok(Box::pin(translated))
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    messages: Vec<ClaudeMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ClaudeTool>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ClaudeTool {
    name: String,
    description: String,
    input_schema: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: serde_json::Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        is_error: bool,
    },
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    content: Vec<ClaudeContent>,
    stop_reason: Option<String>,
    usage: ClaudeUsage,
}

#[derive(Debug, Deserialize)]
struct ClaudeUsage {
    input_tokens: usize,
    output_tokens: usize,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeStreamEvent {
    MessageStart {
        #[allow(dead_code)]
        message: serde_json::Value,
    },
    ContentBlockStart {
        #[allow(dead_code)]
        index: usize,
        content_block: ClaudeStreamBlock,
    },
    ContentBlockDelta {
        #[allow(dead_code)]
        index: usize,
        delta: ClaudeStreamDelta,
    },
    ContentBlockStop {
        #[allow(dead_code)]
        index: usize,
    },
    MessageDelta {
        delta: ClaudeMessageDelta,
        usage: ClaudeUsage,
    },
    MessageStop,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeStreamBlock {
    Text {
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
enum ClaudeStreamDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
struct ClaudeMessageDelta {
    stop_reason: Option<String>,
}

/// Helper used only so `stream()` can early-return an empty stream from
/// synchronous error paths without duplicating the `BoxStream` type.
#[allow(dead_code)]
fn empty_stream() -> BoxStream<'static, Result<StreamEvent>> {
    Box::pin(stream::empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction() {
        let config = RemoteLlmConfig::new("test-key", "https://api.anthropic.com", "claude-sonnet-4");
        let _client = ClaudeClient::new(config);
    }

    #[test]
    fn message_conversion_splits_system_prompt() {
        let config = RemoteLlmConfig::new("test-key", "https://api.anthropic.com", "claude-sonnet-4");
        let client = ClaudeClient::new(config);

        let messages = vec![Message::system("You are a careful reviewer"), Message::user("Hello")];
        let (system, claude_messages) = client.convert_messages(&messages);

        assert_eq!(system, Some("You are a careful reviewer".to_string()));
        assert_eq!(claude_messages.len(), 1);
        assert_eq!(claude_messages[0].role, "user");
    }

    #[test]
    fn tool_result_message_becomes_user_turn() {
        let config = RemoteLlmConfig::new("test-key", "https://api.anthropic.com", "claude-sonnet-4");
        let client = ClaudeClient::new(config);

        let messages = vec![Message::tool_results(vec![crate::message::ToolResult {
            tool_call_id: "call_1".to_string(),
            name: "add_claim".to_string(),
            is_error: false,
            content: serde_json::json!({"ok": true}),
        }])];
        let (_, claude_messages) = client.convert_messages(&messages);
        assert_eq!(claude_messages[0].role, "user");
    }
}

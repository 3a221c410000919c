//! OpenAI-compatible client implementation.
//!
//! Also used for any provider exposing an OpenAI-compatible `/chat/completions`
//! endpoint (OpenRouter, local gateways, etc.) by pointing `base_url` at it.

use crate::config::RemoteLlmConfig;
use crate::error::{LlmError, Result};
use crate::message::{Message, Role, ToolCall, ToolDefinition};
use crate::request::{ChatRequest, ChatResponse, StreamEvent, UsageMetadata};
use crate::traits::ChatModel;
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::stream::{BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// OpenAI (or OpenAI-compatible) chat completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    http: Client,
}

impl OpenAiClient {
    pub fn new(config: RemoteLlmConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .expect("failed to build reqwest client");
        Self { config, http }
    }

    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        let mut out = Vec::new();
        for msg in messages {
            match msg.role {
                Role::System => out.push(OpenAiMessage {
                    role: "system".to_string(),
                    content: Some(msg.text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
                Role::User => out.push(OpenAiMessage {
                    role: "user".to_string(),
                    content: Some(msg.text.clone()),
                    tool_calls: None,
                    tool_call_id: None,
                }),
                Role::Assistant => out.push(OpenAiMessage {
                    role: "assistant".to_string(),
                    content: if msg.text.is_empty() { None } else { Some(msg.text.clone()) },
                    tool_calls: if msg.tool_calls.is_empty() {
                        None
                    } else {
                        Some(
                            msg.tool_calls
                                .iter()
                                .map(|c| OpenAiToolCall {
                                    id: c.id.clone(),
                                    r#type: "function".to_string(),
                                    function: OpenAiFunctionCall {
                                        name: c.name.clone(),
                                        arguments: c.arguments.to_string(),
                                    },
                                })
                                .collect(),
                        )
                    },
                    tool_call_id: None,
                }),
                Role::Tool => {
                    for result in &msg.tool_results {
                        out.push(OpenAiMessage {
                            role: "tool".to_string(),
                            content: Some(result.content.to_string()),
                            tool_calls: None,
                            tool_call_id: Some(result.tool_call_id.clone()),
                        });
                    }
                }
            }
        }
        out
    }

    fn convert_tools(tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                r#type: "function".to_string(),
                function: OpenAiFunctionDef {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.input_schema.clone(),
                },
            })
            .collect()
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> OpenAiRequest {
        OpenAiRequest {
            model: self.config.model.clone(),
            messages: self.convert_messages(&request.messages),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
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
            _ => LlmError::ProviderError(format!("OpenAI API error {status}: {body}")),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let body = self.build_request(&request, false);

        let mut req = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body);
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &text));
        }

        let parsed: OpenAiResponse = response.json().await?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("empty choices array".to_string()))?;

        let tool_calls: Vec<ToolCall> = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|c| ToolCall {
                id: c.id,
                name: c.function.name,
                arguments: serde_json::from_str(&c.function.arguments).unwrap_or(serde_json::json!({})),
            })
            .collect();

        let message = if tool_calls.is_empty() {
            Message::assistant(choice.message.content.unwrap_or_default())
        } else {
            Message {
                role: Role::Assistant,
                text: choice.message.content.unwrap_or_default(),
                tool_calls,
                tool_results: Vec::new(),
            }
        };

        let usage = parsed
            .usage
            .map(|u| UsageMetadata::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        Ok(ChatResponse {
            message,
            usage,
            stop_reason: choice.finish_reason,
        })
    }

    async fn stream(&self, request: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let body = self.build_request(&request, true);

        let mut req = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body);
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let response = req.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Self::map_http_error(status, &text));
        }

        let raw_events = response.bytes_stream().eventsource();

        // OpenAI streams tool-call argument fragments keyed by index rather
        // than by a stable id; we key the accumulator map by index and only
        // surface a `ToolUseStart` once a later chunk or `[DONE]` closes it out.
        let mut pending: HashMap<usize, (String, String, String)> = HashMap::new();

        let translated = raw_events.filter_map(move |raw| {
            let event = match raw {
                Ok(e) => e,
                Err(e) => return futures::future::ready(Some(Err(LlmError::ProviderError(e.to_string())))),
            };
            if event.data == "[DONE]" {
                let finished: Vec<StreamEvent> = pending
                    .drain()
                    .map(|(_, (id, name, json))| StreamEvent::ToolUseStart {
                        id,
                        name,
                        arguments: serde_json::from_str(&json).unwrap_or(serde_json::json!({})),
                    })
                    .collect();
                // Only one item can flow out of filter_map; if there were
                // multiple parallel tool calls pending we'd need a different
                // combinator, but chat-loop turns issue at most one call here.
                return futures::future::ready(finished.into_iter().next().map(Ok));
            }

            let chunk: OpenAiStreamChunk = match serde_json::from_str(&event.data) {
                Ok(v) => v,
                Err(e) => return futures::future::ready(Some(Err(LlmError::InvalidResponse(e.to_string())))),
            };
            let Some(choice) = chunk.choices.into_iter().next() else {
                return futures::future::ready(None);
            };

            if let Some(content) = choice.delta.content {
                if !content.is_empty() {
                    return futures::future::ready(Some(Ok(StreamEvent::TextDelta { delta: content })));
                }
            }

            if let Some(calls) = choice.delta.tool_calls {
                for call in calls {
                    let entry = pending.entry(call.index).or_insert_with(|| (String::new(), String::new(), String::new()));
                    if let Some(id) = call.id {
                        entry.0 = id;
                    }
                    if let Some(function) = call.function {
                        if let Some(name) = function.name {
                            entry.1 = name;
                        }
                        if let Some(args) = function.arguments {
                            entry.2.push_str(&args);
                        }
                    }
                }
                return futures::future::ready(None);
            }

            if let Some(reason) = choice.finish_reason {
                return futures::future::ready(Some(Ok(StreamEvent::Stop {
                    usage: UsageMetadata::default(),
                    stop_reason: Some(reason),
                })));
            }

            futures::future::ready(None)
        });

        Ok(Box::pin(translated))
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    r#type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    r#type: String,
    function: OpenAiFunctionDef,
}

#[derive(Debug, Serialize)]
struct OpenAiFunctionDef {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    choices: Vec<OpenAiStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: usize,
    id: Option<String>,
    function: Option<OpenAiStreamFunctionCall>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunctionCall {
    name: Option<String>,
    arguments: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_construction() {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", "gpt-4o");
        let _client = OpenAiClient::new(config);
    }

    #[test]
    fn message_conversion_preserves_roles() {
        let config = RemoteLlmConfig::new("test-key", "https://api.openai.com/v1", "gpt-4o");
        let client = OpenAiClient::new(config);

        let msg = Message::user("Hello");
        let converted = client.convert_messages(&[msg]);

        assert_eq!(converted[0].role, "user");
        assert_eq!(converted[0].content, Some("Hello".to_string()));
    }
}

//! Request/response envelopes passed to and from a [`crate::ChatModel`].

use crate::message::{Message, ToolDefinition};
use serde::{Deserialize, Serialize};

/// A chat completion request: full message history plus the tool surface
/// and sampling configuration for this call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            tools: Vec::new(),
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Token accounting returned alongside a completion.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl UsageMetadata {
    pub fn new(input_tokens: usize, output_tokens: usize) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }
}

/// A complete, non-streamed model response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: UsageMetadata,
    /// Why the provider stopped generating, when it reports one.
    pub stop_reason: Option<String>,
}

/// One incremental event from a streamed chat completion.
///
/// These map directly onto `§6`'s client-facing event stream (`text`,
/// `tool_use`, `tool_result`, `done`): the orchestrator translates each
/// `StreamEvent` into one UI event as it arrives, in generation order
/// (testable property 9).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StreamEvent {
    /// An incremental fragment of assistant text.
    TextDelta { delta: String },
    /// The model has requested a tool call; arguments are complete once
    /// this event is seen (the underlying providers buffer partial JSON
    /// argument deltas internally and only emit this once parseable).
    ToolUseStart {
        id: String,
        name: String,
        arguments: serde_json::Value,
    },
    /// Final token usage and stop reason, always the last event.
    Stop {
        usage: UsageMetadata,
        stop_reason: Option<String>,
    },
}

//! Conversation messages and tool-calling types shared by every provider.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Role of a message within a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    System,
    User,
    Assistant,
    /// The result of a tool call, fed back to the model.
    Tool,
}

/// A single request to invoke a tool, as emitted by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Provider-assigned id, echoed back in the matching tool result.
    pub id: String,
    /// Name of the tool to invoke; must match a [`ToolDefinition::name`].
    pub name: String,
    /// Arguments, already parsed from the provider's JSON encoding.
    pub arguments: Value,
}

/// The result of executing a [`ToolCall`], to be appended to the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Must match the originating [`ToolCall::id`].
    pub tool_call_id: String,
    pub name: String,
    /// `true` if the tool raised an error; providers format this distinctly.
    pub is_error: bool,
    pub content: Value,
}

/// One message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Free text content. Empty for assistant turns that are pure tool calls.
    #[serde(default)]
    pub text: String,
    /// Tool calls requested by the assistant in this turn, if any.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Tool results being reported back to the model, if this is a tool turn.
    #[serde(default)]
    pub tool_results: Vec<ToolResult>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
        }
    }

    pub fn assistant_tool_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            text: String::new(),
            tool_calls,
            tool_results: Vec::new(),
        }
    }

    pub fn tool_results(results: Vec<ToolResult>) -> Self {
        Self {
            role: Role::Tool,
            text: String::new(),
            tool_calls: Vec::new(),
            tool_results: results,
        }
    }
}

/// A tool the model is permitted to call, described by a JSON Schema for its
/// arguments. Mirrors the agent tool surface in §4.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
        }
    }
}

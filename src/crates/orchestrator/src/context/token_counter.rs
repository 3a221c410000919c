//! Token counting for chat-session context budgeting.

use hg_llm::Message;
use serde_json::Value;

/// Token count result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenCount {
    pub tokens: usize,
    pub chars: usize,
}

impl TokenCount {
    pub fn new(tokens: usize, chars: usize) -> Self {
        Self { tokens, chars }
    }

    pub fn add(&mut self, other: TokenCount) {
        self.tokens += other.tokens;
        self.chars += other.chars;
    }
}

/// Token counting method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountingMethod {
    /// Character-based approximation (fast, less accurate).
    Approximation,
    /// Byte-pair encoding simulation (more accurate).
    BpeSimulation,
}

/// Token counter calibrated to a model family.
pub struct TokenCounter {
    tokens_per_char: f32,
    method: CountingMethod,
}

impl TokenCounter {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            tokens_per_char: Self::get_tokens_per_char(&model),
            method: CountingMethod::Approximation,
        }
    }

    pub fn with_method(mut self, method: CountingMethod) -> Self {
        self.method = method;
        self
    }

    fn get_tokens_per_char(model: &str) -> f32 {
        if model.contains("gpt") || model.contains("openai") {
            0.25
        } else if model.contains("claude") || model.contains("anthropic") {
            0.27
        } else if model.contains("llama") {
            0.23
        } else {
            0.25
        }
    }

    pub fn count_text(&self, text: &str) -> TokenCount {
        let chars = text.len();
        let tokens = match self.method {
            CountingMethod::Approximation => (chars as f32 * self.tokens_per_char).ceil() as usize,
            CountingMethod::BpeSimulation => {
                let words = text.split_whitespace().count();
                let punct = text.chars().filter(|c| c.is_ascii_punctuation()).count();
                let base_tokens = words + (punct / 2);
                (base_tokens as f32 * 1.3).ceil() as usize
            }
        };
        TokenCount::new(tokens, chars)
    }

    pub fn count_message(&self, message: &Message) -> TokenCount {
        let mut total = TokenCount::new(1, 0); // role
        total.add(self.count_text(&message.text));
        for call in &message.tool_calls {
            total.add(self.count_text(&call.name));
            total.add(self.count_tool_response(&call.arguments));
        }
        for result in &message.tool_results {
            total.add(self.count_tool_response(&result.content));
        }
        total.add(TokenCount::new(3, 0)); // formatting overhead
        total
    }

    pub fn count_messages(&self, messages: &[Message]) -> TokenCount {
        let mut total = TokenCount::new(0, 0);
        for message in messages {
            total.add(self.count_message(message));
        }
        total
    }

    pub fn count_tool_response(&self, response: &Value) -> TokenCount {
        let json_str = serde_json::to_string(response).unwrap_or_default();
        let mut count = self.count_text(&json_str);
        count.add(TokenCount::new(5, 0));
        count
    }

    pub fn count_system_prompt(&self, prompt: &str) -> TokenCount {
        let mut count = self.count_text(prompt);
        count.add(TokenCount::new(4, 0));
        count
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        Self::new("claude-sonnet-4")
    }
}

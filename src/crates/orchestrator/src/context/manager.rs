//! Context manager for one chat session's message history.

use crate::context::token_counter::{TokenCount, TokenCounter};
use crate::context::trimmer::{ContextTrimmer, TrimStrategy};
use hg_llm::Message;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Context usage snapshot, surfaced so a session can warn a client before
/// the next turn would overflow the model's window.
#[derive(Debug, Clone)]
pub struct ContextUsage {
    pub used: usize,
    pub available: usize,
    pub total: usize,
    pub percentage: f64,
    pub warning_level: WarningLevel,
}

impl ContextUsage {
    pub fn new(used: usize, total: usize, response_reserved: usize) -> Self {
        let available = total.saturating_sub(used).saturating_sub(response_reserved);
        let percentage = (used as f64 / total as f64) * 100.0;
        let warning_level = if percentage >= 95.0 {
            WarningLevel::Critical
        } else if percentage >= 85.0 {
            WarningLevel::High
        } else if percentage >= 70.0 {
            WarningLevel::Medium
        } else if percentage >= 50.0 {
            WarningLevel::Low
        } else {
            WarningLevel::None
        };
        Self {
            used,
            available,
            total,
            percentage,
            warning_level,
        }
    }

    pub fn is_approaching_limit(&self) -> bool {
        self.percentage >= 70.0
    }

    pub fn is_critical(&self) -> bool {
        matches!(self.warning_level, WarningLevel::Critical)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Context window limits for a model, derived from its id.
#[derive(Debug, Clone, Copy)]
pub struct ContextLimits {
    pub max_tokens: usize,
    pub system_reserved: usize,
    pub response_reserved: usize,
}

impl ContextLimits {
    pub fn for_model(model: &str) -> Self {
        let max_tokens = if model.contains("claude-3") || model.contains("claude-sonnet") || model.contains("claude-opus") {
            200_000
        } else if model.contains("claude-2") {
            100_000
        } else if model.contains("claude") {
            9_000
        } else if model.contains("gpt-4-turbo") || model.contains("gpt-4-32k") {
            128_000
        } else if model.contains("gpt-4") {
            8_192
        } else if model.contains("gpt-3.5-turbo-16k") {
            16_384
        } else if model.contains("gpt-3.5") {
            4_096
        } else {
            4_096
        };

        Self {
            max_tokens,
            system_reserved: 500,
            response_reserved: 1000,
        }
    }

    pub fn available_for_history(&self) -> usize {
        self.max_tokens.saturating_sub(self.system_reserved).saturating_sub(self.response_reserved)
    }
}

/// Owns one session's message history, trimming it to fit the configured
/// model's context window before every turn (`§4.5` ambient addition).
pub struct ContextManager {
    model: String,
    counter: TokenCounter,
    trimmer: ContextTrimmer,
    limits: ContextLimits,
    messages: Arc<RwLock<Vec<Message>>>,
    system_prompt: Arc<RwLock<Option<String>>>,
}

impl ContextManager {
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        let limits = ContextLimits::for_model(&model);
        let available_tokens = limits.available_for_history();
        Self {
            counter: TokenCounter::new(&model),
            trimmer: ContextTrimmer::new(&model, available_tokens),
            limits,
            model,
            messages: Arc::new(RwLock::new(Vec::new())),
            system_prompt: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_limits(mut self, limits: ContextLimits) -> Self {
        self.limits = limits;
        self.trimmer = ContextTrimmer::new(&self.model, limits.available_for_history());
        self
    }

    pub fn with_trim_strategy(mut self, strategy: TrimStrategy) -> Self {
        self.trimmer = self.trimmer.with_strategy(strategy);
        self
    }

    pub async fn set_system_prompt(&self, prompt: impl Into<String>) {
        *self.system_prompt.write().await = Some(prompt.into());
    }

    pub async fn get_system_prompt(&self) -> Option<String> {
        self.system_prompt.read().await.clone()
    }

    pub async fn add_message(&self, message: Message) {
        self.messages.write().await.push(message);
    }

    pub async fn add_messages(&self, new_messages: Vec<Message>) {
        self.messages.write().await.extend(new_messages);
    }

    /// Messages trimmed to the configured strategy and token budget — what
    /// a turn actually sends to the model.
    pub async fn get_messages(&self) -> Vec<Message> {
        let messages = self.messages.read().await;
        self.trimmer.trim_messages(&messages)
    }

    /// Full untrimmed history — what the conversation log persists.
    pub async fn get_all_messages(&self) -> Vec<Message> {
        self.messages.read().await.clone()
    }

    pub async fn clear_messages(&self) {
        self.messages.write().await.clear();
    }

    pub async fn get_token_count(&self) -> TokenCount {
        let messages = self.messages.read().await;
        let mut total = self.counter.count_messages(&messages);
        if let Some(prompt) = &*self.system_prompt.read().await {
            total.add(self.counter.count_system_prompt(prompt));
        }
        total
    }

    pub async fn can_add_message(&self, message: &Message) -> bool {
        let current_count = self.get_token_count().await;
        let message_count = self.counter.count_message(message);
        current_count.tokens + message_count.tokens + self.limits.response_reserved <= self.limits.max_tokens
    }

    pub async fn remaining_tokens(&self) -> usize {
        let current_count = self.get_token_count().await;
        self.limits.max_tokens.saturating_sub(current_count.tokens).saturating_sub(self.limits.response_reserved)
    }

    pub async fn get_usage(&self) -> ContextUsage {
        let current_count = self.get_token_count().await;
        ContextUsage::new(current_count.tokens, self.limits.max_tokens, self.limits.response_reserved)
    }

    pub async fn is_approaching_limit(&self) -> bool {
        self.get_usage().await.is_approaching_limit()
    }

    pub async fn is_critical(&self) -> bool {
        self.get_usage().await.is_critical()
    }

    pub fn estimate_tool_response_tokens(&self, response: &Value) -> TokenCount {
        self.counter.count_tool_response(response)
    }

    pub fn limits(&self) -> ContextLimits {
        self.limits
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Truncate long strings/arrays within a tool response so a single
    /// oversized `read_graph` result can't blow the turn's token budget.
    pub fn summarize_tool_response(&self, response: &Value, max_tokens: usize) -> Value {
        let current_tokens = self.counter.count_tool_response(response).tokens;
        if current_tokens <= max_tokens {
            return response.clone();
        }

        match response {
            Value::Object(map) => {
                let mut summarized = serde_json::Map::new();
                let tokens_per_field = max_tokens / map.len().max(1);
                for (key, value) in map {
                    let summarized_value = match value {
                        Value::String(s) if s.len() > 200 => {
                            let preview_len = (tokens_per_field * 4).min(200);
                            Value::String(format!(
                                "{}... [truncated {} chars]",
                                &s.chars().take(preview_len).collect::<String>(),
                                s.len()
                            ))
                        }
                        Value::Array(arr) if arr.len() > 10 => {
                            Value::String(format!("[Array with {} items - truncated]", arr.len()))
                        }
                        other => other.clone(),
                    };
                    summarized.insert(key.clone(), summarized_value);
                }
                Value::Object(summarized)
            }
            Value::Array(arr) if arr.len() > 10 => {
                let keep_count = (max_tokens / 10).min(5);
                let mut result: Vec<_> = arr.iter().take(keep_count).cloned().collect();
                result.push(Value::String(format!("... {} more items truncated", arr.len() - keep_count)));
                Value::Array(result)
            }
            Value::String(s) if s.len() > 500 => {
                let preview_len = (max_tokens * 4).min(500);
                Value::String(format!(
                    "{}... [truncated {} chars]",
                    &s.chars().take(preview_len).collect::<String>(),
                    s.len()
                ))
            }
            other => other.clone(),
        }
    }

    pub async fn fit_to_window(&self, messages: Vec<Message>) -> Vec<Message> {
        let count = self.counter.count_messages(&messages);
        if count.tokens <= self.limits.available_for_history() {
            return messages;
        }
        self.trimmer.trim_messages(&messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_manager_picks_limits_from_model_id() {
        let manager = ContextManager::new("claude-sonnet-4");
        assert_eq!(manager.model(), "claude-sonnet-4");
        assert_eq!(manager.limits().max_tokens, 200_000);
    }

    #[tokio::test]
    async fn add_and_get_messages_round_trip() {
        let manager = ContextManager::new("claude-sonnet-4");
        manager.add_message(Message::user("Hello")).await;
        manager.add_message(Message::assistant("Hi")).await;
        assert_eq!(manager.get_all_messages().await.len(), 2);
    }

    #[tokio::test]
    async fn system_prompt_round_trips() {
        let manager = ContextManager::new("claude-sonnet-4");
        manager.set_system_prompt("You are an entailment-checking assistant.").await;
        assert_eq!(manager.get_system_prompt().await.as_deref(), Some("You are an entailment-checking assistant."));
    }

    #[tokio::test]
    async fn clear_messages_empties_history() {
        let manager = ContextManager::new("claude-sonnet-4");
        manager.add_message(Message::user("Hello")).await;
        manager.clear_messages().await;
        assert_eq!(manager.get_all_messages().await.len(), 0);
    }

    #[tokio::test]
    async fn usage_reports_none_warning_when_mostly_empty() {
        let manager = ContextManager::new("claude-sonnet-4");
        for i in 0..10 {
            manager.add_message(Message::user(format!("Message {i}"))).await;
        }
        let usage = manager.get_usage().await;
        assert!(usage.used > 0);
        assert_eq!(usage.total, 200_000);
        assert_eq!(usage.warning_level, WarningLevel::None);
    }

    #[tokio::test]
    async fn fit_to_window_trims_when_over_budget() {
        let manager = ContextManager::new("claude-sonnet-4")
            .with_limits(ContextLimits {
                max_tokens: 100,
                system_reserved: 10,
                response_reserved: 10,
            })
            .with_trim_strategy(TrimStrategy::Recent);
        let messages: Vec<_> = (0..20).map(|i| Message::user(format!("Message {i}"))).collect();
        let fitted = manager.fit_to_window(messages.clone()).await;
        assert!(fitted.len() < messages.len());
    }

    #[tokio::test]
    async fn summarize_tool_response_shrinks_large_payloads() {
        let manager = ContextManager::new("claude-sonnet-4");
        let large_response = serde_json::json!({
            "data": "A".repeat(1000),
            "items": vec!["item"; 20],
        });
        let summarized = manager.summarize_tool_response(&large_response, 50);
        let original_str = serde_json::to_string(&large_response).unwrap();
        let summarized_str = serde_json::to_string(&summarized).unwrap();
        assert!(summarized_str.len() < original_str.len());
    }
}

//! Context window trimming strategies.

use crate::context::token_counter::TokenCounter;
use hg_llm::{Message, Role};

/// Message priority for retention during trimming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MessagePriority {
    /// Trim first.
    Low = 0,
    Normal = 1,
    /// Trim last.
    High = 2,
    /// Never trim.
    System = 3,
}

/// Trim strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrimStrategy {
    /// Keep the most recent messages.
    Recent,
    /// Keep based on priority.
    Priority,
    /// Sliding window with overlap.
    SlidingWindow { overlap: usize },
}

/// Trims a message history down to a token budget.
pub struct ContextTrimmer {
    counter: TokenCounter,
    strategy: TrimStrategy,
    max_tokens: usize,
}

impl ContextTrimmer {
    pub fn new(model: impl Into<String>, max_tokens: usize) -> Self {
        Self {
            counter: TokenCounter::new(model),
            strategy: TrimStrategy::Priority,
            max_tokens,
        }
    }

    pub fn with_strategy(mut self, strategy: TrimStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn trim_messages(&self, messages: &[Message]) -> Vec<Message> {
        let total_tokens = self.counter.count_messages(messages);
        if total_tokens.tokens <= self.max_tokens {
            return messages.to_vec();
        }
        match self.strategy {
            TrimStrategy::Recent => self.trim_recent(messages),
            TrimStrategy::Priority => self.trim_by_priority(messages),
            TrimStrategy::SlidingWindow { overlap } => self.trim_sliding_window(messages, overlap),
        }
    }

    fn trim_recent(&self, messages: &[Message]) -> Vec<Message> {
        let mut result = Vec::new();
        let mut current_tokens = 0;
        for message in messages.iter().rev() {
            let msg_tokens = self.counter.count_message(message).tokens;
            if current_tokens + msg_tokens <= self.max_tokens {
                result.insert(0, message.clone());
                current_tokens += msg_tokens;
            } else {
                break;
            }
        }
        result
    }

    fn trim_by_priority(&self, messages: &[Message]) -> Vec<Message> {
        let mut prioritized: Vec<(usize, MessagePriority)> = messages
            .iter()
            .enumerate()
            .map(|(idx, msg)| (idx, self.get_message_priority(msg, idx, messages.len())))
            .collect();

        // Highest priority first, ties broken by original order.
        prioritized.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let mut kept_indices = std::collections::HashSet::new();
        let mut current_tokens = 0;
        for (idx, _) in prioritized {
            let msg_tokens = self.counter.count_message(&messages[idx]).tokens;
            if current_tokens + msg_tokens <= self.max_tokens {
                kept_indices.insert(idx);
                current_tokens += msg_tokens;
            }
        }

        messages
            .iter()
            .enumerate()
            .filter(|(idx, _)| kept_indices.contains(idx))
            .map(|(_, msg)| msg.clone())
            .collect()
    }

    fn trim_sliding_window(&self, messages: &[Message], overlap: usize) -> Vec<Message> {
        if messages.is_empty() {
            return Vec::new();
        }

        let mut result = Vec::new();
        let mut current_tokens = 0;
        for message in messages.iter().rev() {
            let msg_tokens = self.counter.count_message(message).tokens;
            if current_tokens + msg_tokens <= self.max_tokens {
                result.insert(0, message.clone());
                current_tokens += msg_tokens;
            } else {
                break;
            }
        }

        if result.len() < messages.len() && overlap > 0 {
            let start_idx = messages.len().saturating_sub(result.len() + overlap);
            let end_idx = messages.len() - result.len();
            for message in &messages[start_idx..end_idx] {
                let msg_tokens = self.counter.count_message(message).tokens;
                if current_tokens + msg_tokens <= self.max_tokens {
                    result.insert(0, message.clone());
                    current_tokens += msg_tokens;
                } else {
                    break;
                }
            }
        }

        result
    }

    fn get_message_priority(&self, message: &Message, index: usize, total: usize) -> MessagePriority {
        if message.role == Role::System {
            return MessagePriority::System;
        }
        if index >= total * 4 / 5 {
            return MessagePriority::High;
        }
        if message.text.contains("tool") || message.text.contains("function") || !message.tool_calls.is_empty() || !message.tool_results.is_empty() {
            return MessagePriority::Normal;
        }
        MessagePriority::Low
    }

    pub fn tokens_saved(&self, original: &[Message], trimmed: &[Message]) -> usize {
        let original_count = self.counter.count_messages(original);
        let trimmed_count = self.counter.count_messages(trimmed);
        original_count.tokens.saturating_sub(trimmed_count.tokens)
    }
}

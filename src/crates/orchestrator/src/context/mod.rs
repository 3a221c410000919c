//! Context window management for chat sessions (`§4.5` ambient addition).
//!
//! Token counting, trim strategies, and budget accounting for the message
//! history a [`crate::chat_loop`] turn sends to the model.

pub mod manager;
pub mod token_counter;
pub mod trimmer;

pub use manager::{ContextLimits, ContextManager, ContextUsage, WarningLevel};
pub use token_counter::{TokenCount, TokenCounter};
pub use trimmer::{ContextTrimmer, MessagePriority, TrimStrategy};

//! Provider-agnostic LLM client used by the orchestrator's chat loop and by
//! the judge calls in `hg-judges`.
//!
//! This crate deliberately does not depend on `hypergraph-core`: it knows
//! nothing about claims, implications, or the hypergraph. It exposes a
//! single [`ChatModel`] trait plus its own message/request vocabulary, and
//! ships two remote providers (Claude, OpenAI-compatible) and a scriptable
//! [`mock::MockChatModel`] for tests. Which concrete model backs the chat
//! provider, the Auto Mode provider, and the literature-search tool
//! credential is purely an orchestrator wiring decision.
//!
//! ```rust,ignore
//! use hg_llm::{ChatModel, ChatRequest, Message, RemoteLlmConfig};
//! use hg_llm::remote::ClaudeClient;
//!
//! # async fn run() -> hg_llm::Result<()> {
//! let config = RemoteLlmConfig::from_env(
//!     "ANTHROPIC_API_KEY",
//!     "https://api.anthropic.com",
//!     "claude-sonnet-4-20250514",
//! )?;
//! let client = ClaudeClient::new(config);
//! let response = client.chat(ChatRequest::new(vec![Message::user("Hello")])).await?;
//! println!("{}", response.message.text);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod mock;
pub mod remote;
pub mod request;
pub mod traits;

pub use config::RemoteLlmConfig;
pub use error::{LlmError, Result};
pub use message::{Message, Role, ToolCall, ToolDefinition, ToolResult};
pub use request::{ChatRequest, ChatResponse, StreamEvent, UsageMetadata};
pub use traits::ChatModel;


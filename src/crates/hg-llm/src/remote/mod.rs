//! Remote, cloud-hosted LLM provider implementations.
//!
//! Every provider implements [`crate::ChatModel`] against this crate's own
//! provider-agnostic [`crate::message::Message`]/[`crate::request::ChatRequest`]
//! vocabulary, so the orchestrator and judges never see a provider-specific
//! wire type. `base_url` makes `OpenAiClient` usable against any
//! OpenAI-compatible gateway, not just OpenAI itself.

pub mod claude;
pub mod openai;

pub use claude::ClaudeClient;
pub use openai::OpenAiClient;


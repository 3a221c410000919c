//! Core trait for chat-based language models.
//!
//! This crate does not hard-code a provider. Call sites depend on
//! `Arc<dyn ChatModel>` and the orchestrator is free to wire up Claude,
//! OpenAI, or the in-memory [`crate::mock::MockChatModel`] used in tests,
//! matching the outbound model-provider contract in `§6`: streaming chat
//! with interleaved tool calls, and a single-shot structured-output
//! completion used by the judges and the Auto Mode Supervisor.

use crate::error::Result;
use crate::request::{ChatRequest, ChatResponse, StreamEvent};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A provider-agnostic chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Issue a complete, non-streamed chat request. Used by the judges
    /// (`§4.6`, `§4.7`) and Auto Mode's prompt synthesis (`§4.8`), none of
    /// which need token-by-token delivery.
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;

    /// Stream a chat request as a sequence of [`StreamEvent`]s in
    /// generation order. The orchestrator's chat loop (`§4.5`) consumes
    /// this directly.
    async fn stream(&self, request: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>>;

    /// Whether the provider is reachable and authenticated. Used at
    /// startup to report a tool as disabled rather than fail on first use
    /// (`§6`, missing-key behavior).
    async fn is_available(&self) -> Result<bool> {
        Ok(true)
    }

    /// The model identifier this instance was configured with, for logging
    /// and for the `model` field on persisted conversation turns.
    fn model_id(&self) -> &str;
}

//! A scriptable in-memory [`ChatModel`] for tests that exercise the
//! orchestrator, judges, or Auto Mode without a network call.

use crate::error::Result;
use crate::message::{Message, ToolCall};
use crate::request::{ChatRequest, ChatResponse, StreamEvent, UsageMetadata};
use crate::traits::ChatModel;
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use parking_lot::Mutex;
use std::sync::Arc;

/// One scripted response: either an assistant reply or a set of tool calls.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    Text(String),
    ToolCalls(Vec<ToolCall>),
}

/// A [`ChatModel`] that replays a fixed script of turns in order, looping
/// on the final entry once exhausted rather than panicking, so a single
/// script can back a chat loop that runs more turns than expected.
pub struct MockChatModel {
    model_id: String,
    script: Arc<Mutex<Vec<ScriptedTurn>>>,
    cursor: Arc<Mutex<usize>>,
}

impl MockChatModel {
    pub fn new(model_id: impl Into<String>, script: Vec<ScriptedTurn>) -> Self {
        Self {
            model_id: model_id.into(),
            script: Arc::new(Mutex::new(script)),
            cursor: Arc::new(Mutex::new(0)),
        }
    }

    /// Convenience constructor for a model that only ever returns one fixed
    /// line of text, useful for judge stubs in tests.
    pub fn fixed_text(model_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(model_id, vec![ScriptedTurn::Text(text.into())])
    }

    fn next_turn(&self) -> ScriptedTurn {
        let script = self.script.lock();
        let mut cursor = self.cursor.lock();
        let turn = script
            .get(*cursor)
            .or_else(|| script.last())
            .cloned()
            .unwrap_or_else(|| ScriptedTurn::Text(String::new()));
        if *cursor + 1 < script.len() {
            *cursor += 1;
        }
        turn
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse> {
        let message = match self.next_turn() {
            ScriptedTurn::Text(text) => Message::assistant(text),
            ScriptedTurn::ToolCalls(calls) => Message::assistant_tool_calls(calls),
        };
        Ok(ChatResponse {
            message,
            usage: UsageMetadata::new(0, 0),
            stop_reason: Some("end_turn".to_string()),
        })
    }

    async fn stream(&self, request: ChatRequest) -> Result<BoxStream<'static, Result<StreamEvent>>> {
        let response = self.chat(request).await?;
        let mut events = Vec::new();
        if !response.message.text.is_empty() {
            events.push(StreamEvent::TextDelta {
                delta: response.message.text,
            });
        }
        for call in response.message.tool_calls {
            events.push(StreamEvent::ToolUseStart {
                id: call.id,
                name: call.name,
                arguments: call.arguments,
            });
        }
        events.push(StreamEvent::Stop {
            usage: response.usage,
            stop_reason: response.stop_reason,
        });
        Ok(Box::pin(stream::iter(events.into_iter().map(Ok))))
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_scripted_text_then_holds_on_last() {
        let mock = MockChatModel::new(
            "mock-1",
            vec![ScriptedTurn::Text("first".to_string()), ScriptedTurn::Text("second".to_string())],
        );

        let first = mock.chat(ChatRequest::new(vec![Message::user("hi")])).await.unwrap();
        let second = mock.chat(ChatRequest::new(vec![Message::user("hi")])).await.unwrap();
        let third = mock.chat(ChatRequest::new(vec![Message::user("hi")])).await.unwrap();

        assert_eq!(first.message.text, "first");
        assert_eq!(second.message.text, "second");
        assert_eq!(third.message.text, "second");
    }

    #[tokio::test]
    async fn stream_emits_text_then_stop() {
        let mock = MockChatModel::fixed_text("mock-1", "hello");
        let mut stream = mock.stream(ChatRequest::new(vec![Message::user("hi")])).await.unwrap();

        let first = stream.next().await.unwrap().unwrap();
        assert!(matches!(first, StreamEvent::TextDelta { .. }));
        let second = stream.next().await.unwrap().unwrap();
        assert!(matches!(second, StreamEvent::Stop { .. }));
    }
}

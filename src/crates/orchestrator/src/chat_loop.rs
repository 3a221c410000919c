//! The orchestrator chat loop (`§4.5`): one conversation per (approach,
//! session), streamed and tool-calling until the model stops asking for
//! tools or the per-turn tool-call budget runs out.

use crate::config::OrchestratorConfig;
use crate::conversation_log::{ConversationTurn, ResponsePart};
use crate::error::{OrchestratorError, Result};
use crate::events::OrchestratorEvent;
use crate::session::Session;
use crate::tools::{self, ToolContext};
use futures::StreamExt;
use hg_llm::{ChatModel, ChatRequest, LlmError, Message, StreamEvent, ToolCall, ToolResult};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Render the per-turn system prompt: approach name/path plus the fixed
/// tool surface description (`§4.5` step 1).
pub fn system_prompt(approach_name: &str, approach_path: &str) -> String {
    format!(
        "You are the reasoning assistant for the entailment hypergraph approach \"{approach_name}\" \
(stored at {approach_path}). You grow and validate this hypergraph by adding claims, \
implications, and evidence through your tools. You never assign a score or entailment \
verdict yourself — call check_entailment or evaluate_claim and let the isolated judge decide. \
Keep claim and implication ids short and stable; explain your reasoning in add_implication's \
`reasoning` field."
    )
}

async fn stream_with_retry(
    model: &Arc<dyn ChatModel>,
    request: ChatRequest,
    config: &OrchestratorConfig,
) -> Result<futures::stream::BoxStream<'static, hg_llm::error::Result<StreamEvent>>> {
    let mut attempt = 0;
    loop {
        match model.stream(request.clone()).await {
            Ok(stream) => return Ok(stream),
            Err(e) if e.is_retryable() && attempt < config.max_provider_retries => {
                let delay = config.provider_retry_base_delay * 2u32.pow(attempt);
                tracing::warn!(attempt, error = %e, "provider stream failed, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(OrchestratorError::Provider(e)),
        }
    }
}

/// Upper bound on how long we wait, after signalling cancellation, for
/// `run_turn_inner` to notice and return its partial parts. Cooperative
/// cancellation checks happen at every `select!` suspension point, so this
/// is a backstop against a pathological hang, not the expected path.
const CANCELLATION_GRACE_PERIOD: std::time::Duration = std::time::Duration::from_secs(5);

/// Persist a turn that was cancelled or timed out partway through, so the
/// conversation log always records the exchange even when it never
/// reached a `Stop` event (`§5` cancellation safety, `§8` scenario S6).
async fn persist_cancelled(session: &Session, user_text: &str, parts: Vec<ResponsePart>) -> Result<()> {
    session
        .log
        .append(ConversationTurn {
            user_text: user_text.to_string(),
            parts,
            ended_at: chrono::Utc::now(),
            cancelled: true,
        })
        .await
}

/// Run one user turn to completion (or cancellation), emitting events to
/// `events_tx` and persisting the turn to the session's conversation log.
pub async fn run_turn(
    session: Arc<Session>,
    model: Arc<dyn ChatModel>,
    tool_ctx: Arc<ToolContext>,
    config: Arc<OrchestratorConfig>,
    events_tx: broadcast::Sender<OrchestratorEvent>,
    cancellation: CancellationToken,
    user_text: String,
) -> Result<()> {
    let inner = run_turn_inner(&session, &model, &tool_ctx, &config, &events_tx, &cancellation, &user_text);
    tokio::pin!(inner);

    let turn_result = tokio::select! {
        res = &mut inner => res,
        _ = tokio::time::sleep(config.turn_timeout) => {
            // Don't drop `inner` here: that would discard whatever partial
            // text/tool-results it had accumulated without ever persisting
            // them. Signal cancellation instead and let its own
            // cancellation branch (which already knows how to append the
            // partial turn) resolve on its next suspension point.
            cancellation.cancel();
            let _ = events_tx.send(OrchestratorEvent::warning("turn timed out"));
            match tokio::time::timeout(CANCELLATION_GRACE_PERIOD, &mut inner).await {
                Ok(res) => res,
                Err(_) => Err(OrchestratorError::Cancelled),
            }
        }
    };

    match turn_result {
        Ok(parts) => {
            session
                .log
                .append(ConversationTurn {
                    user_text,
                    parts,
                    ended_at: chrono::Utc::now(),
                    cancelled: false,
                })
                .await?;
            let _ = events_tx.send(OrchestratorEvent::done());
            Ok(())
        }
        Err(err) => {
            let _ = events_tx.send(OrchestratorEvent::error(err.to_string()));
            Err(err)
        }
    }
}

async fn run_turn_inner(
    session: &Arc<Session>,
    model: &Arc<dyn ChatModel>,
    tool_ctx: &Arc<ToolContext>,
    config: &OrchestratorConfig,
    events_tx: &broadcast::Sender<OrchestratorEvent>,
    cancellation: &CancellationToken,
    user_text: &str,
) -> Result<Vec<ResponsePart>> {
    session.context.add_message(Message::user(user_text)).await;

    let mut parts = Vec::new();
    let mut tool_calls_made = 0usize;

    loop {
        if cancellation.is_cancelled() {
            persist_cancelled(session, user_text, parts).await?;
            return Err(OrchestratorError::Cancelled);
        }

        let messages = session.context.get_messages().await;
        let request = ChatRequest::new(messages).with_tools(tools::definitions::all());
        let mut stream = stream_with_retry(model, request, config).await?;

        let mut turn_text = String::new();
        let mut pending_tool_calls: Vec<ToolCall> = Vec::new();
        let mut stopped = false;

        loop {
            let next = tokio::select! {
                _ = cancellation.cancelled() => {
                    if !turn_text.is_empty() {
                        session.context.add_message(Message::assistant(turn_text.clone())).await;
                        parts.push(ResponsePart::Text { text: turn_text });
                    }
                    persist_cancelled(session, user_text, parts).await?;
                    return Err(OrchestratorError::Cancelled);
                }
                event = stream.next() => event,
            };

            let Some(event) = next else { break };
            let event = event.map_err(OrchestratorError::Provider)?;

            match event {
                StreamEvent::TextDelta { delta } => {
                    let _ = events_tx.send(OrchestratorEvent::text(&session.id, &delta));
                    turn_text.push_str(&delta);
                }
                StreamEvent::ToolUseStart { id, name, arguments } => {
                    let _ = events_tx.send(OrchestratorEvent::tool_use(&session.id, &name, arguments.clone()));
                    pending_tool_calls.push(ToolCall { id, name, arguments });
                }
                StreamEvent::Stop { .. } => {
                    stopped = true;
                }
            }
        }

        if !turn_text.is_empty() {
            parts.push(ResponsePart::Text { text: turn_text.clone() });
        }

        if pending_tool_calls.is_empty() {
            if !turn_text.is_empty() {
                session.context.add_message(Message::assistant(turn_text)).await;
            }
            if stopped {
                return Ok(parts);
            }
            // The provider closed the stream without a Stop event; treat as done.
            return Ok(parts);
        }

        if !turn_text.is_empty() {
            session.context.add_message(Message::assistant(turn_text)).await;
        }
        session.context.add_message(Message::assistant_tool_calls(pending_tool_calls.clone())).await;

        let mut results = Vec::new();
        for call in pending_tool_calls {
            if tool_calls_made >= config.max_tool_calls_per_turn {
                let _ = events_tx.send(OrchestratorEvent::warning(format!(
                    "tool-call budget of {} exhausted; stopping turn",
                    config.max_tool_calls_per_turn
                )));
                return Err(OrchestratorError::ToolBudgetExhausted(config.max_tool_calls_per_turn));
            }
            tool_calls_made += 1;

            let outcome = tokio::time::timeout(config.tool_timeout, tools::dispatch_tool_call(tool_ctx, &call.name, &call.arguments)).await;

            let (ok, content) = match outcome {
                Ok(Ok(value)) => (true, value),
                Ok(Err(e)) => (false, serde_json::json!({ "error": e.to_string() })),
                Err(_elapsed) => (false, serde_json::json!({ "error": "tool call timed out" })),
            };

            let _ = events_tx.send(OrchestratorEvent::tool_result(&session.id, &call.name, ok, content.clone()));
            parts.push(ResponsePart::ToolResult {
                name: call.name.clone(),
                ok,
                summary: content.clone(),
            });

            results.push(ToolResult {
                tool_call_id: call.id,
                name: call.name,
                is_error: !ok,
                content,
            });
        }

        session.context.add_message(Message::tool_results(results)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;
    use hg_judges::{ClaimEvaluator, EntailmentChecker};
    use hg_llm::mock::{MockChatModel, ScriptedTurn};
    use hypergraph_core::Store;

    async fn test_setup() -> (tempfile::TempDir, Arc<Session>, Arc<ToolContext>) {
        let dir = tempfile::tempdir().unwrap();
        let approach_dir = dir.path().join("approach");
        let store = Store::open(&approach_dir);
        store.init("t", "d").await.unwrap();
        let tool_ctx = Arc::new(ToolContext {
            store: Arc::new(store),
            entailment_checker: Arc::new(EntailmentChecker::new(Arc::new(MockChatModel::fixed_text("judge", "")))),
            claim_evaluator: Arc::new(ClaimEvaluator::new(Arc::new(MockChatModel::fixed_text("judge", "")))),
        });
        let session = Arc::new(Session::new("s1", "mock-chat", dir.path().join("s1.json")));
        (dir, session, tool_ctx)
    }

    #[tokio::test]
    async fn a_pure_text_turn_produces_one_text_part_and_logs_it() {
        let (_dir, session, tool_ctx) = test_setup().await;
        let model: Arc<dyn ChatModel> = Arc::new(MockChatModel::fixed_text("mock-chat", "Hello there."));
        let config = Arc::new(OrchestratorConfig::default());
        let (tx, _rx) = broadcast::channel(16);
        let cancellation = CancellationToken::new();

        run_turn(session.clone(), model, tool_ctx, config, tx, cancellation, "hi".to_string())
            .await
            .unwrap();

        let turns = session.log.load_turns().unwrap();
        assert_eq!(turns.len(), 1);
        assert!(!turns[0].cancelled);
    }

    #[tokio::test]
    async fn a_tool_call_turn_dispatches_and_appends_a_tool_result() {
        let (_dir, session, tool_ctx) = test_setup().await;
        let model: Arc<dyn ChatModel> = Arc::new(MockChatModel::new(
            "mock-chat",
            vec![
                ScriptedTurn::ToolCalls(vec![hg_llm::ToolCall {
                    id: "call1".into(),
                    name: "add_claim".into(),
                    arguments: serde_json::json!({"id": "c1", "text": "A holds"}),
                }]),
                ScriptedTurn::Text("Added the claim.".into()),
            ],
        ));
        let config = Arc::new(OrchestratorConfig::default());
        let (tx, mut rx) = broadcast::channel(16);
        let cancellation = CancellationToken::new();

        run_turn(session.clone(), model, tool_ctx.clone(), config, tx, cancellation, "add a claim".to_string())
            .await
            .unwrap();

        let (graph, _) = tool_ctx.store.load().unwrap();
        assert!(graph.claims.contains_key("c1"));

        let mut saw_tool_result = false;
        while let Ok(event) = rx.try_recv() {
            if matches!(event, OrchestratorEvent::ToolResult { ok: true, .. }) {
                saw_tool_result = true;
            }
        }
        assert!(saw_tool_result);
    }

    #[tokio::test]
    async fn cancelling_before_the_turn_starts_returns_cancelled() {
        let (_dir, session, tool_ctx) = test_setup().await;
        let model: Arc<dyn ChatModel> = Arc::new(MockChatModel::fixed_text("mock-chat", "Hello there."));
        let config = Arc::new(OrchestratorConfig::default());
        let (tx, _rx) = broadcast::channel(16);
        let cancellation = CancellationToken::new();
        cancellation.cancel();

        let err = run_turn(session.clone(), model, tool_ctx, config, tx, cancellation, "hi".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Cancelled));

        // `§5` cancellation safety / `§8` scenario S6: a cancelled turn
        // still persists a cancellation marker in the conversation log.
        let turns = session.log.load_turns().unwrap();
        assert_eq!(turns.len(), 1);
        assert!(turns[0].cancelled);
        assert_eq!(turns[0].user_text, "hi");
    }
}

//! The Auto Mode Supervisor (`§4.8`): drives the orchestrator through up to
//! `max_turns` autonomous turns toward "grow and validate the hypergraph"
//! without further human input.
//!
//! The supervisor never touches the store itself — each turn it synthesizes
//! a goal-directed, user-style prompt and hands it to the same
//! [`crate::chat_loop::run_turn`] a human message would go through, so the
//! separation in `§9` ("scoring is not a tool-call output") holds
//! identically for autonomous and human-driven turns.

use crate::chat_loop;
use crate::config::{OnFixpoint, OrchestratorConfig};
use crate::error::Result;
use crate::events::{AutoState, OrchestratorEvent};
use crate::session::Session;
use crate::tools::ToolContext;
use hg_llm::ChatModel;
use hypergraph_core::{EntailmentStatus, Hypergraph, HYPOTHESIS_ID};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The next single highest-value action the supervisor picked, per the
/// fixed priority in `§4.8` step 2.
#[derive(Debug, Clone, PartialEq)]
enum AutoAction {
    CheckEntailment { implication_id: String },
    ReviseFailedImplication { implication_id: String },
    AddEvidenceForLeaf { claim_id: String, claim_text: String },
    EvaluateClaim { claim_id: String, claim_text: String },
    ExploreFromClaim { claim_id: String, claim_text: String },
}

/// Priority: unchecked implications -> failed implications -> leaf claims
/// lacking evidence -> claims with evidence but no score -> unexplored
/// branches off the root. Returns `None` at a fixpoint (`§9` open question
/// (b), resolved by [`OnFixpoint`]).
fn select_next_action(graph: &Hypergraph) -> Option<AutoAction> {
    if let Some(imp) = graph.implications.values().find(|i| i.entailment_status == EntailmentStatus::Unchecked) {
        return Some(AutoAction::CheckEntailment {
            implication_id: imp.id.clone(),
        });
    }
    if let Some(imp) = graph.implications.values().find(|i| i.entailment_status == EntailmentStatus::Failed) {
        return Some(AutoAction::ReviseFailedImplication {
            implication_id: imp.id.clone(),
        });
    }
    if let Some(claim) = graph.claims.values().find(|c| graph.is_leaf(&c.id) && c.evidence.is_empty()) {
        return Some(AutoAction::AddEvidenceForLeaf {
            claim_id: claim.id.clone(),
            claim_text: claim.text.clone(),
        });
    }
    if let Some(claim) = graph.claims.values().find(|c| !c.evidence.is_empty() && c.score.is_none()) {
        return Some(AutoAction::EvaluateClaim {
            claim_id: claim.id.clone(),
            claim_text: claim.text.clone(),
        });
    }
    if graph.claims.contains_key(HYPOTHESIS_ID) {
        let reachable = graph.reachable_from_root();
        if let Some(claim) = graph.claims.values().find(|c| reachable.contains(&c.id) && graph.is_leaf(&c.id)) {
            return Some(AutoAction::ExploreFromClaim {
                claim_id: claim.id.clone(),
                claim_text: claim.text.clone(),
            });
        }
        if graph.conclusion_implication(HYPOTHESIS_ID).is_none() && graph.claims.len() > 1 {
            let hypothesis_text = graph.claims[HYPOTHESIS_ID].text.clone();
            return Some(AutoAction::ExploreFromClaim {
                claim_id: HYPOTHESIS_ID.to_string(),
                claim_text: hypothesis_text,
            });
        }
    }
    None
}

/// Render one [`AutoAction`] as a user-style message for the chat loop.
fn synthesize_prompt(action: &AutoAction) -> String {
    match action {
        AutoAction::CheckEntailment { implication_id } => format!(
            "Call check_entailment on implication \"{implication_id}\" to validate whether its \
logical step holds."
        ),
        AutoAction::ReviseFailedImplication { implication_id } => format!(
            "Implication \"{implication_id}\" failed its entailment check. Read its \
entailment_explanation, revise the implication (its premises, connective, or reasoning, or add \
an intermediate claim) to fix the defect, then call check_entailment on it again."
        ),
        AutoAction::AddEvidenceForLeaf { claim_id, claim_text } => format!(
            "Claim \"{claim_id}\" (\"{claim_text}\") is a leaf with no evidence. Attach at least \
one evidence item to it (simulation, literature, or calculation) via add_evidence, then call \
evaluate_claim on it."
        ),
        AutoAction::EvaluateClaim { claim_id, claim_text } => format!(
            "Claim \"{claim_id}\" (\"{claim_text}\") has evidence attached but no score yet. \
Call evaluate_claim on it."
        ),
        AutoAction::ExploreFromClaim { claim_id, claim_text } => format!(
            "Claim \"{claim_id}\" (\"{claim_text}\") has no supporting implication yet. Decompose \
it into one or more premise claims and connect them with add_implication, or attach direct \
evidence if no further decomposition makes sense."
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Run,
    Pause,
    Stop,
}

/// Drives one session's chat loop autonomously. One supervisor per
/// (approach, session); the state machine in `§4.8` (idle/running/paused)
/// is represented by `control` plus the `turn_count`/`running` bookkeeping.
pub struct AutoSupervisor {
    session: Arc<Session>,
    model: Arc<dyn ChatModel>,
    tool_ctx: Arc<ToolContext>,
    config: Arc<OrchestratorConfig>,
    events_tx: broadcast::Sender<OrchestratorEvent>,
    control_tx: watch::Sender<Control>,
    control_rx: Mutex<watch::Receiver<Control>>,
    turn_count: AtomicU32,
    current_turn_cancellation: Mutex<Option<CancellationToken>>,
}

impl AutoSupervisor {
    pub fn new(
        session: Arc<Session>,
        model: Arc<dyn ChatModel>,
        tool_ctx: Arc<ToolContext>,
        config: Arc<OrchestratorConfig>,
        events_tx: broadcast::Sender<OrchestratorEvent>,
    ) -> Arc<Self> {
        let (control_tx, control_rx) = watch::channel(Control::Run);
        Arc::new(Self {
            session,
            model,
            tool_ctx,
            config,
            events_tx,
            control_tx,
            control_rx: Mutex::new(control_rx),
            turn_count: AtomicU32::new(0),
            current_turn_cancellation: Mutex::new(None),
        })
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count.load(Ordering::SeqCst)
    }

    fn emit_state(&self, state: AutoState) {
        let _ = self.events_tx.send(OrchestratorEvent::auto_status(state));
    }

    pub fn pause(&self) {
        let _ = self.control_tx.send(Control::Pause);
        self.emit_state(AutoState::Paused);
    }

    pub fn resume(&self) {
        let _ = self.control_tx.send(Control::Run);
        self.emit_state(AutoState::Running);
    }

    /// Stop the run. Cancels the in-progress turn, if any, so a stop takes
    /// effect promptly rather than waiting for the current turn to finish.
    pub async fn stop(&self) {
        let _ = self.control_tx.send(Control::Stop);
        if let Some(token) = self.current_turn_cancellation.lock().await.as_ref() {
            token.cancel();
        }
    }

    /// Run to completion: up to `config.auto_max_turns` turns, terminating
    /// early on a fixpoint (per [`OnFixpoint`]), a `stop()` call, or an
    /// unrecoverable error (`§4.8` state machine transitions to `idle`).
    pub async fn run(self: Arc<Self>) -> Result<()> {
        self.emit_state(AutoState::Running);
        info!(session = %self.session.id, max_turns = self.config.auto_max_turns, "auto mode started");

        loop {
            if self.wait_while_paused_or_stopped().await {
                break;
            }

            if self.turn_count() >= self.config.auto_max_turns {
                info!(session = %self.session.id, "auto mode reached max_turns");
                break;
            }

            let (graph, _report) = self.tool_ctx.store.load()?;
            let Some(action) = select_next_action(&graph) else {
                match self.config.on_fixpoint {
                    OnFixpoint::Terminate => {
                        info!(session = %self.session.id, "auto mode reached a fixpoint");
                        break;
                    }
                    OnFixpoint::Idle => {
                        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
                        continue;
                    }
                }
            };

            let prompt = synthesize_prompt(&action);
            let turn_number = self.turn_count.fetch_add(1, Ordering::SeqCst) + 1;
            let _ = self.events_tx.send(OrchestratorEvent::auto_turn(turn_number, self.config.auto_max_turns));

            let cancellation = CancellationToken::new();
            *self.current_turn_cancellation.lock().await = Some(cancellation.clone());

            let turn_result = tokio::time::timeout(
                self.config.auto_turn_timeout,
                chat_loop::run_turn(
                    self.session.clone(),
                    self.model.clone(),
                    self.tool_ctx.clone(),
                    self.config.clone(),
                    self.events_tx.clone(),
                    cancellation,
                    prompt,
                ),
            )
            .await;

            *self.current_turn_cancellation.lock().await = None;

            match turn_result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    let _ = self.events_tx.send(OrchestratorEvent::error(format!("auto mode turn failed: {e}")));
                    break;
                }
                Err(_elapsed) => {
                    let _ = self.events_tx.send(OrchestratorEvent::warning("auto mode turn timed out"));
                }
            }
        }

        self.emit_state(AutoState::Idle);
        Ok(())
    }

    /// Blocks while paused, returning `true` if the run should stop
    /// entirely. A paused supervisor re-checks the control signal on every
    /// change rather than polling.
    async fn wait_while_paused_or_stopped(&self) -> bool {
        loop {
            let current = *self.control_rx.lock().await.borrow();
            match current {
                Control::Stop => return true,
                Control::Run => return false,
                Control::Pause => {}
            }
            let mut rx = self.control_rx.lock().await;
            if rx.changed().await.is_err() {
                return true;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hg_judges::{ClaimEvaluator, EntailmentChecker};
    use hg_llm::mock::MockChatModel;
    use hypergraph_core::{Claim, ConnectiveType, Implication, Store};

    async fn setup(store_dir: &std::path::Path) -> (Arc<Session>, Arc<ToolContext>) {
        let store = Store::open(store_dir);
        store.init("t", "d").await.unwrap();
        let tool_ctx = Arc::new(ToolContext {
            store: Arc::new(store),
            entailment_checker: Arc::new(EntailmentChecker::new(Arc::new(MockChatModel::fixed_text(
                "judge",
                "<analysis>ok</analysis><valid>true</valid><redundant_premises>none</redundant_premises>\
<degenerate_premises>none</degenerate_premises><suggestions>none</suggestions>",
            )))),
            claim_evaluator: Arc::new(ClaimEvaluator::new(Arc::new(MockChatModel::fixed_text(
                "judge",
                "<score>8</score><reasoning>solid</reasoning>",
            )))),
        });
        let session = Arc::new(Session::new("auto-1", "mock-chat", store_dir.join("auto-1.json")));
        (session, tool_ctx)
    }

    #[test]
    fn selects_unchecked_implications_first() {
        let mut graph = Hypergraph::new(hypergraph_core::ApproachMetadata::new("t", "d"));
        graph.claims.insert(HYPOTHESIS_ID.into(), Claim::new(HYPOTHESIS_ID, "X works"));
        graph.claims.insert("c1".into(), Claim::new("c1", "A holds"));
        graph.implications.insert(
            "i1".into(),
            Implication::new("i1", vec!["c1".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"),
        );
        let action = select_next_action(&graph).unwrap();
        assert!(matches!(action, AutoAction::CheckEntailment { implication_id } if implication_id == "i1"));
    }

    #[test]
    fn falls_back_to_evidence_then_scoring_then_exploration() {
        let mut graph = Hypergraph::new(hypergraph_core::ApproachMetadata::new("t", "d"));
        graph.claims.insert(HYPOTHESIS_ID.into(), Claim::new(HYPOTHESIS_ID, "X works"));
        graph.claims.insert("c1".into(), Claim::new("c1", "A holds"));
        assert!(matches!(select_next_action(&graph), Some(AutoAction::ExploreFromClaim { .. })));

        graph.claims.get_mut("c1").unwrap().evidence.push(hypergraph_core::Evidence::Literature {
            source: "s".into(),
            reference_text: "quote".into(),
        });
        assert!(matches!(select_next_action(&graph), Some(AutoAction::EvaluateClaim { .. })));
    }

    #[test]
    fn fixpoint_is_none_when_nothing_left_to_do() {
        let mut graph = Hypergraph::new(hypergraph_core::ApproachMetadata::new("t", "d"));
        graph.claims.insert(HYPOTHESIS_ID.into(), Claim::new(HYPOTHESIS_ID, "X works").with_score(9.0, "done"));
        assert!(select_next_action(&graph).is_none());
    }

    #[tokio::test]
    async fn run_stops_at_max_turns() {
        let dir = tempfile::tempdir().unwrap();
        let (session, tool_ctx) = setup(dir.path()).await;
        tool_ctx.store.add_claim(Claim::new(hypergraph_core::HYPOTHESIS_ID, "X works")).await.unwrap();
        tool_ctx.store.add_claim(Claim::new("c1", "A holds")).await.unwrap();

        let model: Arc<dyn ChatModel> = Arc::new(MockChatModel::fixed_text("mock-chat", "Working on it."));
        let mut config = OrchestratorConfig::default();
        config.auto_max_turns = 2;
        let config = Arc::new(config);
        let (tx, _rx) = broadcast::channel(64);

        let supervisor = AutoSupervisor::new(session, model, tool_ctx, config, tx);
        supervisor.clone().run().await.unwrap();
        assert_eq!(supervisor.turn_count(), 2);
    }

    #[tokio::test]
    async fn stop_halts_the_run_before_max_turns() {
        let dir = tempfile::tempdir().unwrap();
        let (session, tool_ctx) = setup(dir.path()).await;
        tool_ctx.store.add_claim(Claim::new(hypergraph_core::HYPOTHESIS_ID, "X works")).await.unwrap();
        tool_ctx.store.add_claim(Claim::new("c1", "A holds")).await.unwrap();

        let model: Arc<dyn ChatModel> = Arc::new(MockChatModel::fixed_text("mock-chat", "Working on it."));
        let mut config = OrchestratorConfig::default();
        config.auto_max_turns = 50;
        let config = Arc::new(config);
        let (tx, _rx) = broadcast::channel(64);

        let supervisor = AutoSupervisor::new(session, model, tool_ctx, config, tx);
        supervisor.stop().await;
        supervisor.clone().run().await.unwrap();
        assert_eq!(supervisor.turn_count(), 0);
    }
}

//! Shared application state threaded through every handler (`§6`).

use crate::approach::Workspace;
use crate::config::OrchestratorConfig;
use crate::session::Session;
use crate::tools::ToolContext;
use crate::watcher::{Fanout, Watcher};
use dashmap::DashMap;
use hg_judges::{ClaimEvaluator, EntailmentChecker};
use hg_llm::ChatModel;
use hypergraph_core::{ChangeNotification, Store};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Process-wide state, cheap to clone (everything inside is an `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub config: Arc<OrchestratorConfig>,
    pub fanout: Arc<Fanout>,
    pub watcher: Arc<Watcher>,
    pub chat_model: Arc<dyn ChatModel>,
    pub auto_model: Arc<dyn ChatModel>,
    pub entailment_checker: Arc<EntailmentChecker>,
    pub claim_evaluator: Arc<ClaimEvaluator>,
    pub sessions: Arc<DashMap<String, Arc<Session>>>,
    pub auto_supervisors: Arc<DashMap<String, Arc<crate::auto::AutoSupervisor>>>,
    change_channels: Arc<DashMap<PathBuf, mpsc::UnboundedSender<ChangeNotification>>>,
}

impl AppState {
    pub fn new(
        workspace: Arc<Workspace>,
        config: Arc<OrchestratorConfig>,
        chat_model: Arc<dyn ChatModel>,
        auto_model: Arc<dyn ChatModel>,
        evaluator_model: Arc<dyn ChatModel>,
    ) -> Self {
        let fanout = Fanout::new();
        let watcher = Watcher::new(fanout.clone(), config.watch_debounce);
        Self {
            workspace,
            config,
            fanout,
            watcher,
            chat_model,
            auto_model,
            entailment_checker: Arc::new(EntailmentChecker::new(evaluator_model.clone())),
            claim_evaluator: Arc::new(ClaimEvaluator::new(evaluator_model)),
            sessions: Arc::new(DashMap::new()),
            auto_supervisors: Arc::new(DashMap::new()),
            change_channels: Arc::new(DashMap::new()),
        }
    }

    /// Start (idempotently) the Store-change fast path for `approach_dir`.
    /// Every handler that is about to mutate or stream an approach's graph
    /// calls this first.
    ///
    /// This wires only the fast path (`tool_context` below hands the
    /// resulting channel to every `Store` it builds for this directory),
    /// not the debounced filesystem watch: every write this process makes
    /// to `hypergraph.json` goes through a `Store` that already carries
    /// this channel, so a filesystem watch on the same directory would
    /// fire a second, redundant `hypergraph_update` for the very same
    /// write-temp+rename pair (`§4.9`, `§8` property 11 — exactly one
    /// event per write). `Watcher::watch` remains available for approach
    /// directories this process doesn't itself write to.
    pub fn ensure_approach_active(&self, approach_dir: &Path) {
        if !self.change_channels.contains_key(approach_dir) {
            let (tx, rx) = mpsc::unbounded_channel();
            self.watcher.spawn_change_listener(rx);
            self.change_channels.insert(approach_dir.to_path_buf(), tx);
        }
    }

    /// Build a fresh [`ToolContext`] for one tool call against `approach_dir`.
    /// `Store` is cheap to construct; the per-approach mutation lock lives
    /// in [`hypergraph_core::lock`], not on this handle, so a new `Store`
    /// per request is safe.
    pub fn tool_context(&self, approach_dir: &Path) -> Arc<ToolContext> {
        self.ensure_approach_active(approach_dir);
        let mut store = Store::open(approach_dir).with_history_retention(self.config.history_retention_depth);
        if let Some(tx) = self.change_channels.get(approach_dir) {
            store = store.notify_on_change(tx.clone());
        }
        Arc::new(ToolContext {
            store: Arc::new(store),
            entailment_checker: self.entailment_checker.clone(),
            claim_evaluator: self.claim_evaluator.clone(),
        })
    }
}

//! The Hypergraph Store (`§4.1`): authoritative custodian of one approach's
//! hypergraph. Exposes whole-graph loads, atomic validated whole-graph
//! writes, and scoped mutators built on top of load-mutate-save, all
//! serialized by the per-approach lock in [`crate::lock`].

use crate::cost;
use crate::domain::{Claim, Evidence, Hypergraph, Implication, HYPOTHESIS_ID};
use crate::error::{GraphError, Result};
use crate::lock;
use crate::validator::{self, ValidationReport};
use hypergraph_history::{HistoryEntry, HistoryStore};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

/// A change notification emitted after every successful `save()`, for the
/// Watcher/fan-out layer (`§4.9`) to pick up without waiting on a debounced
/// filesystem event.
#[derive(Debug, Clone)]
pub struct ChangeNotification {
    pub approach_dir: PathBuf,
    pub revision: u64,
}

/// Authoritative handle onto one approach directory.
pub struct Store {
    approach_dir: PathBuf,
    history: HistoryStore,
    change_tx: Option<UnboundedSender<ChangeNotification>>,
}

impl Store {
    pub fn open(approach_dir: impl Into<PathBuf>) -> Self {
        let approach_dir = approach_dir.into();
        Self {
            history: HistoryStore::new(&approach_dir),
            approach_dir,
            change_tx: None,
        }
    }

    pub fn with_history_retention(mut self, depth: usize) -> Self {
        self.history = HistoryStore::new(&self.approach_dir).with_retention_depth(depth);
        self
    }

    /// Wire a channel that receives a [`ChangeNotification`] after every
    /// successful `save()`. The orchestrator's Watcher (`§4.9`) subscribes
    /// here rather than relying solely on debounced filesystem events.
    pub fn notify_on_change(mut self, tx: UnboundedSender<ChangeNotification>) -> Self {
        self.change_tx = Some(tx);
        self
    }

    pub fn approach_dir(&self) -> &Path {
        &self.approach_dir
    }

    fn graph_path(&self) -> PathBuf {
        self.approach_dir.join("hypergraph.json")
    }

    /// Parse `hypergraph.json`, run the Validator, and return the graph
    /// plus its report. Loading succeeds even with fatal validation errors
    /// so the UI can surface them (`§4.1`).
    pub fn load(&self) -> Result<(Hypergraph, ValidationReport)> {
        let bytes = std::fs::read(self.graph_path())?;
        let graph: Hypergraph = serde_json::from_slice(&bytes)?;
        let report = validator::validate(&graph, Some(&self.approach_dir));
        for w in &report.warnings {
            warn!(approach = %self.approach_dir.display(), "{w}");
        }
        Ok((graph, report))
    }

    /// Validate, compute costs, and atomically persist `graph`. Fails with
    /// [`GraphError::InvalidGraph`] if any fatal Validator error remains;
    /// the prior `hypergraph.json` is untouched in that case.
    pub async fn save(&self, graph: &mut Hypergraph) -> Result<()> {
        let report = validator::validate(graph, Some(&self.approach_dir));
        if !report.is_valid() {
            return Err(GraphError::InvalidGraph(report.fatal));
        }

        cost::propagate(graph);

        graph.metadata.revision += 1;
        graph.metadata.updated_at = chrono::Utc::now();
        graph.metadata.validation_summary.fatal_error_count = report.fatal.len();
        graph.metadata.validation_summary.warning_count = report.warnings.len();
        graph.metadata.validation_summary.last_validated_at = Some(graph.metadata.updated_at);

        let bytes = serde_json::to_vec_pretty(graph)?;

        std::fs::create_dir_all(&self.approach_dir)?;

        // Snapshot the outgoing version before it is replaced.
        let graph_path = self.graph_path();
        if let Ok(previous) = std::fs::read(&graph_path) {
            self.history.snapshot(&previous, chrono::Utc::now())?;
        }

        // Write-then-rename: write to a sibling temp file in the same
        // directory (so the rename is same-filesystem and therefore
        // atomic), then persist over the real path.
        let tmp = tempfile::NamedTempFile::new_in(&self.approach_dir)?;
        std::fs::write(tmp.path(), &bytes)?;
        tmp.persist(&graph_path).map_err(|e| e.error)?;
        fsync_dir(&self.approach_dir);

        info!(
            approach = %self.approach_dir.display(),
            revision = graph.metadata.revision,
            claims = graph.claims.len(),
            implications = graph.implications.len(),
            "saved hypergraph"
        );

        if let Some(tx) = &self.change_tx {
            let _ = tx.send(ChangeNotification {
                approach_dir: self.approach_dir.clone(),
                revision: graph.metadata.revision,
            });
        }

        Ok(())
    }

    /// Create a new, empty approach with the given display name/description
    /// and write its first `hypergraph.json`.
    pub async fn init(&self, name: &str, description: &str) -> Result<Hypergraph> {
        let mut graph = Hypergraph::new(crate::domain::ApproachMetadata::new(name, description));
        self.save(&mut graph).await?;
        Ok(graph)
    }

    async fn mutate<F>(&self, f: F) -> Result<Hypergraph>
    where
        F: FnOnce(&mut Hypergraph) -> Result<()>,
    {
        let _guard = lock::acquire(&self.approach_dir).await;
        let (mut graph, _report) = self.load()?;
        f(&mut graph)?;
        self.save(&mut graph).await?;
        Ok(graph)
    }

    pub async fn add_claim(&self, claim: Claim) -> Result<Hypergraph> {
        hg_types::validate_id(&claim.id).map_err(|e| GraphError::InvalidIdGrammar(e.0))?;
        self.mutate(move |graph| {
            if graph.claims.contains_key(&claim.id) {
                return Err(GraphError::DuplicateId(claim.id.clone()));
            }
            graph.claims.insert(claim.id.clone(), claim);
            Ok(())
        })
        .await
    }

    pub async fn add_implication(&self, implication: Implication) -> Result<Hypergraph> {
        hg_types::validate_id(&implication.id).map_err(|e| GraphError::InvalidIdGrammar(e.0))?;
        self.mutate(move |graph| {
            if graph.implications.contains_key(&implication.id) {
                return Err(GraphError::DuplicateId(implication.id.clone()));
            }
            for premise in &implication.premises {
                if !graph.claims.contains_key(premise) {
                    return Err(GraphError::UnknownId(premise.clone()));
                }
            }
            if !graph.claims.contains_key(&implication.conclusion) {
                return Err(GraphError::UnknownId(implication.conclusion.clone()));
            }
            if graph.conclusion_implication(&implication.conclusion).is_some() {
                return Err(GraphError::ConclusionAlreadyClaimed(implication.conclusion.clone()));
            }

            let mut probe = graph.clone();
            probe.implications.insert(implication.id.clone(), implication.clone());
            if cost::topological_order(&probe).is_none() {
                return Err(GraphError::CycleDetected(implication.id.clone()));
            }

            graph.implications.insert(implication.id.clone(), implication);
            Ok(())
        })
        .await
    }

    pub async fn update_claim_evidence(&self, claim_id: &str, evidence: Vec<Evidence>) -> Result<Hypergraph> {
        let claim_id = claim_id.to_string();
        self.mutate(move |graph| {
            let claim = graph.claims.get_mut(&claim_id).ok_or_else(|| GraphError::UnknownId(claim_id.clone()))?;
            claim.evidence.extend(evidence);
            Ok(())
        })
        .await
    }

    /// Replace a claim's evidence outright (a whole-claim edit, `§3`).
    pub async fn replace_claim_evidence(&self, claim_id: &str, evidence: Vec<Evidence>) -> Result<Hypergraph> {
        let claim_id = claim_id.to_string();
        self.mutate(move |graph| {
            let claim = graph.claims.get_mut(&claim_id).ok_or_else(|| GraphError::UnknownId(claim_id.clone()))?;
            claim.evidence = evidence;
            Ok(())
        })
        .await
    }

    pub async fn set_claim_score(&self, claim_id: &str, score: Option<f64>, reasoning: Option<String>) -> Result<Hypergraph> {
        let claim_id = claim_id.to_string();
        self.mutate(move |graph| {
            let claim = graph.claims.get_mut(&claim_id).ok_or_else(|| GraphError::UnknownId(claim_id.clone()))?;
            claim.score = score;
            claim.reasoning = reasoning;
            Ok(())
        })
        .await
    }

    pub async fn set_implication_entailment(
        &self,
        implication_id: &str,
        status: crate::domain::EntailmentStatus,
        explanation: crate::domain::EntailmentExplanation,
        signature: String,
    ) -> Result<Hypergraph> {
        let implication_id = implication_id.to_string();
        self.mutate(move |graph| {
            let imp = graph
                .implications
                .get_mut(&implication_id)
                .ok_or_else(|| GraphError::UnknownId(implication_id.clone()))?;
            imp.entailment_status = status;
            imp.entailment_explanation = Some(explanation);
            imp.last_checked_signature = Some(signature);
            Ok(())
        })
        .await
    }

    /// Remove a claim and every implication incident on it (as premise or
    /// conclusion). The root hypothesis claim may not be deleted (`§3`
    /// supplement: immutable once created).
    pub async fn delete_claim(&self, claim_id: &str) -> Result<Hypergraph> {
        let claim_id = claim_id.to_string();
        self.mutate(move |graph| {
            if claim_id == HYPOTHESIS_ID {
                return Err(GraphError::HypothesisImmutable);
            }
            if !graph.claims.contains_key(&claim_id) {
                return Err(GraphError::UnknownId(claim_id.clone()));
            }
            graph.implications.retain(|_, imp| imp.conclusion != claim_id && !imp.premises.contains(&claim_id));
            graph.claims.remove(&claim_id);
            Ok(())
        })
        .await
    }

    /// Remove orphan claims (unreachable from the root) that have no
    /// incident implications remaining (`§3` lifecycle, `§8` property 12).
    /// The root itself is never removed even if the graph has no root yet.
    pub async fn cleanup_orphans(&self) -> Result<Hypergraph> {
        self.mutate(|graph| {
            let orphans = graph.orphan_ids();
            for id in orphans {
                if id == HYPOTHESIS_ID {
                    continue;
                }
                let has_incident_implication = graph.conclusion_implication(&id).is_some()
                    || graph.implications_with_premise(&id).next().is_some();
                if !has_incident_implication {
                    graph.claims.remove(&id);
                }
            }
            Ok(())
        })
        .await
    }

    pub fn history_list(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.history.list()?)
    }

    pub fn restore(&self, timestamp: &str) -> Result<Hypergraph> {
        let bytes = self.history.restore(timestamp).map_err(|_| GraphError::HistoryNotFound(timestamp.to_string()))?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[cfg(unix)]
fn fsync_dir(dir: &Path) {
    if let Ok(f) = std::fs::File::open(dir) {
        let _ = f.sync_all();
    }
}

#[cfg(not(unix))]
fn fsync_dir(_dir: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConnectiveType, EntailmentStatus};

    fn open_tmp() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path());
        (dir, store)
    }

    #[tokio::test]
    async fn add_claim_then_load_round_trips() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        store.add_claim(Claim::new("c1", "A holds")).await.unwrap();
        let (graph, report) = store.load().unwrap();
        assert!(report.is_valid());
        assert!(graph.claims.contains_key("c1"));
    }

    #[tokio::test]
    async fn duplicate_conclusion_is_rejected_and_leaves_store_unchanged() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        for id in [HYPOTHESIS_ID, "c1", "c2", "c3"] {
            store.add_claim(Claim::new(id, "text")).await.unwrap();
        }
        store
            .add_implication(Implication::new("i1", vec!["c1".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"))
            .await
            .unwrap();
        let before = store.load().unwrap().0;

        let err = store
            .add_implication(Implication::new("i2", vec!["c2".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::ConclusionAlreadyClaimed(_)));

        let after = store.load().unwrap().0;
        assert_eq!(before.implications.len(), after.implications.len());
    }

    #[tokio::test]
    async fn cycle_is_rejected() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        for id in ["a", "b"] {
            store.add_claim(Claim::new(id, "text")).await.unwrap();
        }
        store.add_implication(Implication::new("i1", vec!["a".into()], "b", ConnectiveType::And, "r")).await.unwrap();
        let err = store
            .add_implication(Implication::new("i2", vec!["b".into()], "a", ConnectiveType::And, "r"))
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::CycleDetected(_)));
    }

    #[tokio::test]
    async fn delete_claim_drops_incident_implications() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        for id in [HYPOTHESIS_ID, "c1"] {
            store.add_claim(Claim::new(id, "text")).await.unwrap();
        }
        store
            .add_implication(Implication::new("i1", vec!["c1".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"))
            .await
            .unwrap();
        let graph = store.delete_claim("c1").await.unwrap();
        assert!(!graph.claims.contains_key("c1"));
        assert!(graph.implications.is_empty());
    }

    #[tokio::test]
    async fn hypothesis_claim_cannot_be_deleted() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        store.add_claim(Claim::new(HYPOTHESIS_ID, "X works")).await.unwrap();
        let err = store.delete_claim(HYPOTHESIS_ID).await.unwrap_err();
        assert!(matches!(err, GraphError::HypothesisImmutable));
    }

    #[tokio::test]
    async fn history_records_every_save() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        store.add_claim(Claim::new("c1", "text")).await.unwrap();
        store.add_claim(Claim::new("c2", "text")).await.unwrap();
        let entries = store.history_list().unwrap();
        // init's save() has nothing to snapshot (no prior file); the two
        // add_claim saves each snapshot the version before them.
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn restore_returns_a_prior_version() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        store.add_claim(Claim::new("c1", "text")).await.unwrap();
        let entries = store.history_list().unwrap();
        let snapshot = store.restore(&entries[0].timestamp).unwrap();
        assert!(!snapshot.claims.contains_key("c1"));
    }

    #[tokio::test]
    async fn evidence_mismatch_blocks_save() {
        let (dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        store.add_claim(Claim::new("c1", "text")).await.unwrap();
        std::fs::write(dir.path().join("sim.py"), "a\nb\nc\n").unwrap();
        let bad_evidence = Evidence::Simulation {
            source: "sim.py".into(),
            lines: crate::domain::LineRange::new(1, 2),
            code: "wrong\ncontent".into(),
        };
        let err = store.update_claim_evidence("c1", vec![bad_evidence]).await.unwrap_err();
        assert!(matches!(err, GraphError::InvalidGraph(_)));
    }

    #[tokio::test]
    async fn failed_entailment_propagates_infinite_cost_to_conclusion_only() {
        let (_dir, store) = open_tmp();
        store.init("t", "d").await.unwrap();
        for id in [HYPOTHESIS_ID, "c1", "other"] {
            store.add_claim(Claim::new(id, "text")).await.unwrap();
        }
        store.set_claim_score("c1", Some(8.0), None).await.unwrap();
        store.set_claim_score("other", Some(9.0), None).await.unwrap();
        store
            .add_implication(Implication::new("i1", vec!["c1".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"))
            .await
            .unwrap();
        let graph = store
            .set_implication_entailment(
                "i1",
                EntailmentStatus::Failed,
                crate::domain::EntailmentExplanation::default(),
                "sig".into(),
            )
            .await
            .unwrap();
        assert!(graph.claims[HYPOTHESIS_ID].cost.unwrap().is_infinite());
        assert!(!graph.claims["other"].cost.unwrap().is_infinite());
    }
}

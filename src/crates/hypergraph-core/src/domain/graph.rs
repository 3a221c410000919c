//! The in-memory hypergraph value: claims, implications, and metadata.

use super::claim::Claim;
use super::implication::Implication;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The reserved id of the root hypothesis claim (invariant 7).
pub const HYPOTHESIS_ID: &str = hg_types::HYPOTHESIS_ID;

/// Identifying and bookkeeping metadata for one approach's hypergraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproachMetadata {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped on every successful `save()` so watcher subscribers can detect
    /// missed updates even when content happens to be byte-identical
    /// (`SPEC_FULL.md §3` supplement).
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub validation_summary: ValidationSummary,
}

impl ApproachMetadata {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.into(),
            description: description.into(),
            created_at: now,
            updated_at: now,
            revision: 0,
            validation_summary: ValidationSummary::default(),
        }
    }
}

/// A snapshot of the most recent validation run, cached in metadata so a UI
/// can show a summary without re-running the Validator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub fatal_error_count: usize,
    pub warning_count: usize,
    pub last_validated_at: Option<DateTime<Utc>>,
}

/// The whole-graph value the Store loads, mutates, and saves.
///
/// `claims` and `implications` are `BTreeMap`s (not `HashMap`) so that
/// serialized JSON and iteration order are deterministic — important for
/// the validation round-trip property (`§8` property 1) and for reproducible
/// `history/` diffs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypergraph {
    pub metadata: ApproachMetadata,
    pub claims: BTreeMap<String, Claim>,
    pub implications: BTreeMap<String, Implication>,
}

impl Hypergraph {
    pub fn new(metadata: ApproachMetadata) -> Self {
        Self {
            metadata,
            claims: BTreeMap::new(),
            implications: BTreeMap::new(),
        }
    }

    /// The implication whose conclusion is `claim_id`, if any (invariant 3
    /// guarantees at most one).
    pub fn conclusion_implication(&self, claim_id: &str) -> Option<&Implication> {
        self.implications.values().find(|i| i.conclusion == claim_id)
    }

    /// All implications that list `claim_id` among their premises.
    pub fn implications_with_premise<'a>(&'a self, claim_id: &'a str) -> impl Iterator<Item = &'a Implication> {
        self.implications.values().filter(move |i| i.premises.iter().any(|p| p == claim_id))
    }

    /// `true` iff no implication has `claim_id` as its conclusion.
    pub fn is_leaf(&self, claim_id: &str) -> bool {
        self.conclusion_implication(claim_id).is_none()
    }

    /// Claim ids reachable from the root hypothesis by walking
    /// conclusion -> premises edges in reverse (i.e. everything that
    /// (directly or transitively) supports the hypothesis).
    pub fn reachable_from_root(&self) -> std::collections::HashSet<String> {
        let mut seen = std::collections::HashSet::new();
        let mut stack = Vec::new();
        if self.claims.contains_key(HYPOTHESIS_ID) {
            stack.push(HYPOTHESIS_ID.to_string());
        }
        while let Some(id) = stack.pop() {
            if !seen.insert(id.clone()) {
                continue;
            }
            if let Some(imp) = self.conclusion_implication(&id) {
                for premise in &imp.premises {
                    stack.push(premise.clone());
                }
            }
        }
        seen
    }

    /// Claim ids not reachable from the root (`§3` orphan definition).
    pub fn orphan_ids(&self) -> Vec<String> {
        let reachable = self.reachable_from_root();
        self.claims.keys().filter(|id| !reachable.contains(*id)).cloned().collect()
    }
}

//! Schema & Invariant Validator (`§4.2`).
//!
//! Runs over an in-memory [`Hypergraph`] and returns fatal errors and
//! non-fatal warnings separately. Fatal errors block `Store::save` (`§4.1`);
//! warnings are surfaced to the caller (and, ultimately, the UI) without
//! blocking anything.

use crate::domain::{EntailmentStatus, Hypergraph, HYPOTHESIS_ID};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The outcome of running the Validator once.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub fatal: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.fatal.is_empty()
    }
}

/// Validate `graph`'s structure. `approach_dir`, if given, is used to check
/// simulation-evidence files on disk; when `None`, that check is skipped
/// (e.g. validating an in-memory graph with no backing directory yet).
pub fn validate(graph: &Hypergraph, approach_dir: Option<&Path>) -> ValidationReport {
    let mut report = ValidationReport::default();

    check_id_grammar(graph, &mut report);
    check_score_ranges(graph, &mut report);
    let claim_ids = check_claim_id_uniqueness(graph, &mut report);
    check_implication_id_uniqueness(graph, &mut report);
    check_references_resolve(graph, &claim_ids, &mut report);
    check_conclusion_uniqueness(graph, &mut report);
    check_acyclic(graph, &mut report);
    check_at_most_one_hypothesis_is_final(graph, &mut report);
    if let Some(dir) = approach_dir {
        check_simulation_evidence_matches(graph, dir, &mut report);
    }
    check_stale_entailments(graph, &mut report);

    report
}

fn check_id_grammar(graph: &Hypergraph, report: &mut ValidationReport) {
    for id in graph.claims.keys() {
        if hg_types::validate_id(id).is_err() {
            report.fatal.push(format!("claim id {id:?} does not match the required grammar"));
        }
    }
    for id in graph.implications.keys() {
        if hg_types::validate_id(id).is_err() {
            report.fatal.push(format!("implication id {id:?} does not match the required grammar"));
        }
    }
}

fn check_score_ranges(graph: &Hypergraph, report: &mut ValidationReport) {
    for claim in graph.claims.values() {
        if let Some(score) = claim.score {
            if !(0.0..=10.0).contains(&score) || score.is_nan() {
                report.fatal.push(format!("claim {:?} has out-of-range score {score}", claim.id));
            }
        }
    }
}

fn check_claim_id_uniqueness(graph: &Hypergraph, report: &mut ValidationReport) -> HashSet<String> {
    // `BTreeMap` keys are already unique by construction; this check exists
    // for graphs deserialized from hand-edited JSON where the key and the
    // claim's own `id` field might disagree.
    let mut ids = HashSet::new();
    for (key, claim) in &graph.claims {
        if key != &claim.id {
            report.fatal.push(format!("claim map key {key:?} does not match claim.id {:?}", claim.id));
        }
        if !ids.insert(claim.id.clone()) {
            report.fatal.push(format!("duplicate claim id {:?}", claim.id));
        }
    }
    ids
}

fn check_implication_id_uniqueness(graph: &Hypergraph, report: &mut ValidationReport) {
    let mut ids = HashSet::new();
    for (key, imp) in &graph.implications {
        if key != &imp.id {
            report.fatal.push(format!("implication map key {key:?} does not match implication.id {:?}", imp.id));
        }
        if !ids.insert(imp.id.clone()) {
            report.fatal.push(format!("duplicate implication id {:?}", imp.id));
        }
        if imp.premises.is_empty() {
            report.fatal.push(format!("implication {:?} has no premises", imp.id));
        }
    }
}

fn check_references_resolve(graph: &Hypergraph, claim_ids: &HashSet<String>, report: &mut ValidationReport) {
    for imp in graph.implications.values() {
        for premise in &imp.premises {
            if !claim_ids.contains(premise) {
                report.fatal.push(format!(
                    "implication {:?} references unknown premise claim {premise:?}",
                    imp.id
                ));
            }
        }
        if !claim_ids.contains(&imp.conclusion) {
            report.fatal.push(format!(
                "implication {:?} references unknown conclusion claim {:?}",
                imp.id, imp.conclusion
            ));
        }
    }
}

fn check_conclusion_uniqueness(graph: &Hypergraph, report: &mut ValidationReport) {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for imp in graph.implications.values() {
        if let Some(prior) = seen.insert(imp.conclusion.as_str(), imp.id.as_str()) {
            report.fatal.push(format!(
                "claim {:?} is the conclusion of both {prior:?} and {:?} (invariant 3)",
                imp.conclusion, imp.id
            ));
        }
    }
}

/// Kahn's algorithm over the premise -> conclusion edge direction.
fn check_acyclic(graph: &Hypergraph, report: &mut ValidationReport) {
    if crate::cost::topological_order(graph).is_none() {
        report.fatal.push("the implication graph contains a cycle".to_string());
    }
}

/// Invariant 7's second clause: if `hypothesis` exists, it must be the
/// *final* conclusion — it may not itself serve as a premise anywhere.
fn check_at_most_one_hypothesis_is_final(graph: &Hypergraph, report: &mut ValidationReport) {
    if !graph.claims.contains_key(HYPOTHESIS_ID) {
        return;
    }
    if graph.implications_with_premise(HYPOTHESIS_ID).next().is_some() {
        report.fatal.push(
            "the root hypothesis claim must be a final conclusion, not a premise of another implication".to_string(),
        );
    }
}

fn check_simulation_evidence_matches(graph: &Hypergraph, approach_dir: &Path, report: &mut ValidationReport) {
    use crate::domain::Evidence;

    for claim in graph.claims.values() {
        for ev in &claim.evidence {
            if let Evidence::Simulation { source, lines, code } = ev {
                let resolved = approach_dir.join(source);
                if !resolved.starts_with(approach_dir) {
                    // Open Question (a): evidence whose source escapes the
                    // approach directory. We treat it as a fatal mismatch
                    // rather than silently trusting an absolute/`..` path.
                    report.fatal.push(format!(
                        "claim {:?} cites simulation source {source:?} outside the approach directory",
                        claim.id
                    ));
                    continue;
                }
                match std::fs::read_to_string(&resolved) {
                    Ok(contents) => match lines.slice(&contents) {
                        Some(actual) if actual == *code => {}
                        Some(_) | None => {
                            report.fatal.push(format!(
                                "claim {:?} evidence code does not match {source:?} at lines {:?}..{:?}",
                                claim.id, lines.start, lines.end
                            ));
                        }
                    },
                    Err(_) => {
                        report.fatal.push(format!(
                            "claim {:?} cites simulation source {source:?} which could not be read",
                            claim.id
                        ));
                    }
                }
            }
        }
    }
}

fn check_stale_entailments(graph: &Hypergraph, report: &mut ValidationReport) {
    for imp in graph.implications.values() {
        if imp.entailment_status == EntailmentStatus::Unchecked {
            continue;
        }
        let Some(conclusion) = graph.claims.get(&imp.conclusion) else {
            continue;
        };
        let premise_texts: Vec<&str> = imp
            .premises
            .iter()
            .filter_map(|p| graph.claims.get(p))
            .map(|c| c.text.as_str())
            .collect();
        if premise_texts.len() != imp.premises.len() {
            continue; // already reported as an unresolved reference
        }
        if imp.is_stale(&premise_texts, &conclusion.text) {
            report.warnings.push(format!(
                "implication {:?} was last checked {:?} but its premises/conclusion text has since changed",
                imp.id, imp.entailment_status
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ApproachMetadata, Claim, ConnectiveType, Implication};

    fn base_graph() -> Hypergraph {
        Hypergraph::new(ApproachMetadata::new("t", "d"))
    }

    #[test]
    fn empty_graph_is_valid() {
        let report = validate(&base_graph(), None);
        assert!(report.is_valid());
    }

    #[test]
    fn duplicate_conclusion_is_fatal() {
        let mut g = base_graph();
        for id in ["c1", "c2", "c3", HYPOTHESIS_ID] {
            g.claims.insert(id.to_string(), Claim::new(id, "text"));
        }
        g.implications.insert(
            "i1".into(),
            Implication::new("i1", vec!["c1".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"),
        );
        g.implications.insert(
            "i2".into(),
            Implication::new("i2", vec!["c2".into()], HYPOTHESIS_ID, ConnectiveType::And, "r"),
        );
        let report = validate(&g, None);
        assert!(!report.is_valid());
        assert!(report.fatal.iter().any(|e| e.contains("invariant 3")));
    }

    #[test]
    fn cycle_is_fatal() {
        let mut g = base_graph();
        for id in ["a", "b"] {
            g.claims.insert(id.to_string(), Claim::new(id, "text"));
        }
        g.implications.insert(
            "i1".into(),
            Implication::new("i1", vec!["a".into()], "b", ConnectiveType::And, "r"),
        );
        g.implications.insert(
            "i2".into(),
            Implication::new("i2", vec!["b".into()], "a", ConnectiveType::And, "r"),
        );
        let report = validate(&g, None);
        assert!(!report.is_valid());
        assert!(report.fatal.iter().any(|e| e.contains("cycle")));
    }

    #[test]
    fn out_of_range_score_is_fatal() {
        let mut g = base_graph();
        g.claims.insert("c1".into(), Claim::new("c1", "text").with_score(11.0, "bad"));
        let report = validate(&g, None);
        assert!(!report.is_valid());
    }
}

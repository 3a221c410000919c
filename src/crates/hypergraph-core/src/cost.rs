//! Cost Propagation Engine (`§4.3`).
//!
//! Turns per-claim scores plus implication structure into a single epistemic
//! cost for every claim, in the spirit of an entailment-tree cost function:
//! AND sums `-log2(p)` over premises, OR takes the minimum. The algorithm is
//! a Kahn topological sort over the premise -> conclusion edges, evaluated
//! leaves-first so every claim's cost is computed exactly once even when it
//! is shared as a premise of many implications.

use crate::domain::{Claim, ConnectiveType, CostValue, EntailmentStatus, Hypergraph};
use std::collections::{HashMap, VecDeque};

/// Evidence-epistemic cost of a single score, per `§4.3`:
/// `-log2(score/10)` for `score` in `(0, 10]`, `0` at `score == 10`,
/// `+Infinity` for `score == 0` or `None`.
pub fn evidence_cost(score: Option<f64>) -> CostValue {
    match score {
        None => CostValue::INFINITY,
        Some(s) if s <= 0.0 => CostValue::INFINITY,
        Some(s) if s >= 10.0 => CostValue::ZERO,
        Some(s) => CostValue::finite(-(s / 10.0).log2()),
    }
}

/// Recompute every claim's `evidence_epistemic_cost`, `experimental_epistemic_cost`,
/// and `cost` in place. Pure function of the graph's current claims and
/// implications (`§9`: "cost propagation must be a pure function of the
/// stored graph").
///
/// Returns the ids of implications whose entailment status is `unchecked`
/// and therefore contributed an *unverified* experimental cost, so the
/// caller (the Store) can annotate metadata accordingly.
pub fn propagate(graph: &mut Hypergraph) -> Vec<String> {
    let mut unverified = Vec::new();
    let Some(order) = topological_order(graph) else {
        // Unreachable in a validated graph (the Validator rejects cycles
        // before `save()` ever calls this), but propagation must still be
        // total: leave costs as previously cached rather than panicking.
        return unverified;
    };

    let mut costs: HashMap<String, CostValue> = HashMap::new();

    // `order` lists claim ids leaves-first (a claim's premises, if it has
    // a conclusion-implication, appear before it).
    for claim_id in &order {
        let claim = graph.claims.get(claim_id).expect("topological order only contains known claims");
        let own_evidence_cost = evidence_cost(claim.score);

        let experimental = graph.conclusion_implication(claim_id).map(|imp| {
            if imp.entailment_status == EntailmentStatus::Failed {
                return CostValue::INFINITY;
            }
            if imp.entailment_status == EntailmentStatus::Unchecked {
                unverified.push(imp.id.clone());
            }
            let premise_costs: Vec<CostValue> =
                imp.premises.iter().map(|p| *costs.get(p).unwrap_or(&CostValue::INFINITY)).collect();
            match imp.connective {
                ConnectiveType::And => CostValue::finite(premise_costs.iter().map(|c| c.0).sum()),
                ConnectiveType::Or => premise_costs
                    .into_iter()
                    .fold(CostValue::INFINITY, |acc, c| if c.0 < acc.0 { c } else { acc }),
            }
        });

        let total = match experimental {
            Some(exp) if exp.0 < own_evidence_cost.0 => exp,
            Some(_) | None => own_evidence_cost,
        };

        costs.insert(claim_id.clone(), total);

        let claim = graph.claims.get_mut(claim_id).expect("claim exists");
        claim.evidence_epistemic_cost = Some(own_evidence_cost);
        claim.experimental_epistemic_cost = experimental;
        claim.cost = Some(total);
    }

    unverified
}

/// Topological order of claim ids such that every claim appears after all
/// of its conclusion-implication's premises (Kahn's algorithm over the
/// premise -> conclusion direction). Returns `None` if the implication graph
/// has a cycle.
pub fn topological_order(graph: &Hypergraph) -> Option<Vec<String>> {
    // Edge: premise -> conclusion. in_degree(claim) = number of distinct
    // implications that must be resolved before this claim's own
    // conclusion-implication can run, i.e. the number of premises of its
    // conclusion-implication that haven't been resolved yet. We instead run
    // Kahn over implications directly: an implication is "ready" once all
    // its premises' own conclusion-implications have resolved.
    //
    // Simpler formulation: build a dependency graph between claims where
    // claim A depends on claim B if B is a premise of A's
    // conclusion-implication. Then a standard Kahn sort over claims.
    let mut in_degree: HashMap<&str, usize> = graph.claims.keys().map(|k| (k.as_str(), 0)).collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for imp in graph.implications.values() {
        let conclusion = imp.conclusion.as_str();
        let Some(degree) = in_degree.get_mut(conclusion) else {
            continue; // unresolved reference; Validator reports this separately
        };
        *degree += imp.premises.len();
        for premise in &imp.premises {
            dependents.entry(premise.as_str()).or_default().push(conclusion);
        }
    }

    let mut queue: VecDeque<&str> =
        in_degree.iter().filter(|(_, d)| **d == 0).map(|(k, _)| *k).collect();
    let mut order = Vec::with_capacity(graph.claims.len());

    while let Some(claim_id) = queue.pop_front() {
        order.push(claim_id.to_string());
        if let Some(deps) = dependents.get(claim_id) {
            for &dependent in deps {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }
    }

    if order.len() == graph.claims.len() {
        Some(order)
    } else {
        None // cycle: some claims never reached in-degree zero
    }
}

/// A claim with no evidence and no conclusion-implication has only its
/// (infinite) evidence cost. Exposed for callers that want a single claim's
/// cost without recomputing the whole graph (e.g. a UI tooltip).
pub fn claim_total_cost(claim: &Claim) -> CostValue {
    claim.cost.unwrap_or_else(|| evidence_cost(claim.score))
}

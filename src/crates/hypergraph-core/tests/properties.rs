//! Property-based tests for `§8` properties 3 (acyclicity) and 5 (cost
//! monotonicity under AND/OR), run over randomly generated forests of
//! implications rather than the hand-picked scenarios in `cost.rs`'s unit
//! tests.

use hypergraph_core::domain::{ApproachMetadata, Claim, ConnectiveType, EntailmentStatus, Hypergraph, Implication};
use hypergraph_core::{cost, validator};
use proptest::prelude::*;

/// Build a random forest of implications: each non-root claim is either a
/// leaf (score only) or gets a conclusion-implication over a subset of
/// *earlier* claims as premises. Premises strictly precede their
/// conclusion in claim order, so the resulting implication graph is
/// acyclic by construction — this is how `add_implication`'s own
/// cycle-rejection keeps the store's graph acyclic in practice (`§4.1`
/// rejects any call that would introduce a cycle, so every graph the
/// store ever persists is built incrementally in topological order like
/// this).
fn random_forest(scores: Vec<f64>, structure: Vec<(usize, Vec<usize>, bool)>) -> Hypergraph {
    let mut g = Hypergraph::new(ApproachMetadata::new("t", "d"));
    let ids: Vec<String> = (0..scores.len()).map(|i| format!("c{i}")).collect();

    for (i, score) in scores.iter().enumerate() {
        g.claims.insert(ids[i].clone(), Claim::new(&ids[i], "claim").with_score(*score, "r"));
    }

    let mut conclusions_taken = std::collections::HashSet::new();
    let mut imp_count = 0;
    for (conclusion_idx, premise_idxs, is_and) in structure {
        if conclusion_idx >= ids.len() || conclusions_taken.contains(&conclusion_idx) {
            continue;
        }
        // Only allow premises strictly before the conclusion to keep the
        // forest acyclic by construction.
        let premises: Vec<String> = premise_idxs
            .into_iter()
            .filter(|&p| p < conclusion_idx)
            .map(|p| ids[p].clone())
            .collect();
        if premises.is_empty() {
            continue;
        }
        conclusions_taken.insert(conclusion_idx);
        imp_count += 1;
        let connective = if is_and { ConnectiveType::And } else { ConnectiveType::Or };
        let mut imp = Implication::new(format!("i{imp_count}"), premises, &ids[conclusion_idx], connective, "r");
        imp.entailment_status = EntailmentStatus::Passed;
        g.implications.insert(imp.id.clone(), imp);
    }

    g
}

proptest! {
    /// `§8` property 3: any graph assembled this way (premises strictly
    /// preceding their conclusion, exactly as `add_implication` enforces
    /// at the store boundary) stays acyclic, so the Validator's Kahn-sort
    /// acyclicity check must always accept it and cost propagation must
    /// always find a full topological order.
    #[test]
    fn forest_built_forward_is_always_acyclic(
        scores in prop::collection::vec(0.0f64..=10.0, 1..12),
        structure in prop::collection::vec(
            (0usize..12, prop::collection::vec(0usize..12, 0..4), any::<bool>()),
            0..8,
        ),
    ) {
        let graph = random_forest(scores, structure);
        prop_assert!(cost::topological_order(&graph).is_some());
        let report = validator::validate(&graph, None);
        prop_assert!(!report.fatal.iter().any(|e| e.contains("cycle")));
    }

    /// `§8` property 5 (AND half): lowering any one premise's score never
    /// decreases its AND-conclusion's propagated cost.
    #[test]
    fn and_cost_is_monotonic_in_premise_score(
        base_scores in prop::collection::vec(1.0f64..=10.0, 2..6),
        lowered_idx in 0usize..5,
        delta in 0.1f64..=5.0,
    ) {
        prop_assume!(lowered_idx < base_scores.len());

        let n = base_scores.len();
        let ids: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();
        let conclusion_idx = n; // one past the premises

        let build = |scores: &[f64]| {
            let mut g = Hypergraph::new(ApproachMetadata::new("t", "d"));
            for (i, s) in scores.iter().enumerate() {
                g.claims.insert(ids[i].clone(), Claim::new(&ids[i], "p").with_score(*s, "r"));
            }
            g.claims.insert("hypothesis".into(), Claim::new("hypothesis", "root"));
            let mut imp = Implication::new("i1", ids.clone(), "hypothesis", ConnectiveType::And, "r");
            imp.entailment_status = EntailmentStatus::Passed;
            g.implications.insert("i1".into(), imp);
            g
        };

        let mut high_scores = base_scores.clone();
        let mut low_scores = base_scores.clone();
        low_scores[lowered_idx] = (low_scores[lowered_idx] - delta).max(0.001);

        let mut high = build(&high_scores);
        let mut low = build(&low_scores);
        cost::propagate(&mut high);
        cost::propagate(&mut low);

        let high_cost = high.claims["hypothesis"].cost.unwrap().0;
        let low_cost = low.claims["hypothesis"].cost.unwrap().0;
        let _ = conclusion_idx;

        // Lowering a premise's score never decreases the AND-conclusion's
        // cost (cost moves the *opposite* direction of truth).
        prop_assert!(low_cost >= high_cost - 1e-9, "low={low_cost} high={high_cost}");
    }

    /// `§8` property 5 (OR half): raising any one premise's score never
    /// increases the OR-conclusion's cost above the prior minimum.
    #[test]
    fn or_cost_never_increases_when_a_premise_score_rises(
        base_scores in prop::collection::vec(0.5f64..=9.0, 2..6),
        raised_idx in 0usize..5,
        delta in 0.1f64..=5.0,
    ) {
        prop_assume!(raised_idx < base_scores.len());

        let n = base_scores.len();
        let ids: Vec<String> = (0..n).map(|i| format!("p{i}")).collect();

        let build = |scores: &[f64]| {
            let mut g = Hypergraph::new(ApproachMetadata::new("t", "d"));
            for (i, s) in scores.iter().enumerate() {
                g.claims.insert(ids[i].clone(), Claim::new(&ids[i], "p").with_score(*s, "r"));
            }
            g.claims.insert("hypothesis".into(), Claim::new("hypothesis", "root"));
            let mut imp = Implication::new("i1", ids.clone(), "hypothesis", ConnectiveType::Or, "r");
            imp.entailment_status = EntailmentStatus::Passed;
            g.implications.insert("i1".into(), imp);
            g
        };

        let mut before_scores = base_scores.clone();
        let mut after_scores = base_scores.clone();
        after_scores[raised_idx] = (after_scores[raised_idx] + delta).min(10.0);

        let mut before = build(&before_scores);
        let mut after = build(&after_scores);
        cost::propagate(&mut before);
        cost::propagate(&mut after);

        let before_cost = before.claims["hypothesis"].cost.unwrap().0;
        let after_cost = after.claims["hypothesis"].cost.unwrap().0;

        prop_assert!(after_cost <= before_cost + 1e-9, "after={after_cost} before={before_cost}");
    }

    /// `§8` property 4: propagation is idempotent regardless of the random
    /// forest shape.
    #[test]
    fn propagation_is_idempotent_over_random_forests(
        scores in prop::collection::vec(0.0f64..=10.0, 1..10),
        structure in prop::collection::vec(
            (0usize..10, prop::collection::vec(0usize..10, 0..3), any::<bool>()),
            0..6,
        ),
    ) {
        let mut graph = random_forest(scores, structure);
        cost::propagate(&mut graph);
        let first: Vec<Option<f64>> = graph.claims.values().map(|c| c.cost.map(|v| v.0)).collect();
        cost::propagate(&mut graph);
        let second: Vec<Option<f64>> = graph.claims.values().map(|c| c.cost.map(|v| v.0)).collect();
        prop_assert_eq!(first, second);
    }
}

//! Tool-call dispatch (`§4.4`): routes a [`hg_llm::ToolCall`] from the chat
//! model into [`hypergraph_core::Store`] mutations and, for the two judge
//! tools, an isolated [`hg_judges`] LLM call. This is the only place model
//! output ever reaches the store — the model itself never writes a score
//! or an entailment status (`§9`).

use crate::error::{OrchestratorError, Result};
use hg_judges::{ClaimEvaluator, EntailmentChecker};
use hypergraph_core::{Claim, ConnectiveType, Evidence, Hypergraph, Implication, Store};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Everything a tool call needs to act on one approach.
pub struct ToolContext {
    pub store: Arc<Store>,
    pub entailment_checker: Arc<EntailmentChecker>,
    pub claim_evaluator: Arc<ClaimEvaluator>,
}

/// Execute one tool call by name, returning the JSON payload to report back
/// to the model as a [`hg_llm::ToolResult::content`].
pub async fn dispatch(ctx: &ToolContext, tool_name: &str, arguments: &Value) -> Result<Value> {
    match tool_name {
        "read_graph" => read_graph(ctx).await,
        "add_claim" => add_claim(ctx, arguments).await,
        "add_implication" => add_implication(ctx, arguments).await,
        "add_evidence" => add_evidence(ctx, arguments).await,
        "check_entailment" => check_entailment(ctx, arguments).await,
        "evaluate_claim" => evaluate_claim(ctx, arguments).await,
        "delete_claim" => delete_claim(ctx, arguments).await,
        other => Err(OrchestratorError::InvalidToolCall(format!("unknown tool '{other}'"))),
    }
}

fn parse_args<T: for<'de> Deserialize<'de>>(tool_name: &str, arguments: &Value) -> Result<T> {
    serde_json::from_value(arguments.clone())
        .map_err(|e| OrchestratorError::InvalidToolCall(format!("{tool_name}: {e}")))
}

async fn read_graph(ctx: &ToolContext) -> Result<Value> {
    let (graph, report) = ctx.store.load()?;
    Ok(serde_json::json!({
        "graph": graph,
        "validation_warnings": report.warnings,
    }))
}

#[derive(Deserialize)]
struct AddClaimArgs {
    id: String,
    text: String,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    uncertainties: Option<Vec<String>>,
}

async fn add_claim(ctx: &ToolContext, arguments: &Value) -> Result<Value> {
    let args: AddClaimArgs = parse_args("add_claim", arguments)?;
    let mut claim = Claim::new(args.id, args.text);
    claim.tags = args.tags;
    claim.uncertainties = args.uncertainties;
    let graph = ctx.store.add_claim(claim).await?;
    Ok(serde_json::json!({ "ok": true, "revision": graph.metadata.revision }))
}

#[derive(Deserialize)]
struct AddImplicationArgs {
    id: String,
    premises: Vec<String>,
    conclusion: String,
    #[serde(rename = "type")]
    connective: ConnectiveType,
    reasoning: String,
}

async fn add_implication(ctx: &ToolContext, arguments: &Value) -> Result<Value> {
    let args: AddImplicationArgs = parse_args("add_implication", arguments)?;
    let implication = Implication::new(args.id, args.premises, args.conclusion, args.connective, args.reasoning);
    let graph = ctx.store.add_implication(implication).await?;
    Ok(serde_json::json!({ "ok": true, "revision": graph.metadata.revision }))
}

#[derive(Deserialize)]
struct AddEvidenceArgs {
    claim_id: String,
    evidence: Evidence,
}

async fn add_evidence(ctx: &ToolContext, arguments: &Value) -> Result<Value> {
    let args: AddEvidenceArgs = parse_args("add_evidence", arguments)?;
    let graph = ctx.store.update_claim_evidence(&args.claim_id, vec![args.evidence]).await?;
    Ok(serde_json::json!({ "ok": true, "revision": graph.metadata.revision }))
}

#[derive(Deserialize, Default)]
struct CheckEntailmentArgs {
    #[serde(default)]
    force: bool,
    #[serde(default)]
    implication_ids: Option<Vec<String>>,
}

/// Resolve the current premise/conclusion texts for `implication` against
/// `graph`, returning `None` if any referenced claim is missing (the
/// Validator would already have flagged this as `UnknownId`).
fn resolve_texts<'a>(graph: &'a Hypergraph, implication: &Implication) -> Option<(Vec<&'a str>, &'a str)> {
    let premise_texts = implication
        .premises
        .iter()
        .map(|id| graph.claims.get(id).map(|c| c.text.as_str()))
        .collect::<Option<Vec<_>>>()?;
    let conclusion_text = graph.claims.get(&implication.conclusion)?.text.as_str();
    Some((premise_texts, conclusion_text))
}

async fn check_entailment(ctx: &ToolContext, arguments: &Value) -> Result<Value> {
    let args: CheckEntailmentArgs = parse_args("check_entailment", arguments).unwrap_or_default();
    let (graph, _report) = ctx.store.load()?;

    let candidate_ids: Vec<String> = match &args.implication_ids {
        Some(ids) => ids.clone(),
        None => graph
            .implications
            .values()
            .filter(|imp| {
                args.force
                    || resolve_texts(&graph, imp).map(|(p, c)| imp.is_stale(&p, c)).unwrap_or(true)
            })
            .map(|imp| imp.id.clone())
            .collect(),
    };

    let mut checked = Vec::new();
    let mut skipped = Vec::new();
    for id in candidate_ids {
        let Some(implication) = graph.implications.get(&id) else {
            skipped.push(serde_json::json!({ "id": id, "reason": "unknown implication" }));
            continue;
        };
        let Some((premise_texts, conclusion_text)) = resolve_texts(&graph, implication) else {
            skipped.push(serde_json::json!({ "id": id, "reason": "premise or conclusion claim missing" }));
            continue;
        };

        let verdict = ctx.entailment_checker.check(implication, &premise_texts, conclusion_text).await?;
        ctx.store
            .set_implication_entailment(&id, verdict.status, verdict.explanation, verdict.signature)
            .await?;
        checked.push(serde_json::json!({ "id": id, "status": verdict.status }));
    }

    Ok(serde_json::json!({ "checked": checked, "skipped": skipped }))
}

#[derive(Deserialize)]
struct EvaluateClaimArgs {
    claim_id: String,
}

async fn evaluate_claim(ctx: &ToolContext, arguments: &Value) -> Result<Value> {
    let args: EvaluateClaimArgs = parse_args("evaluate_claim", arguments)?;
    let (graph, _report) = ctx.store.load()?;
    let claim = graph
        .claims
        .get(&args.claim_id)
        .ok_or_else(|| OrchestratorError::InvalidToolCall(format!("unknown claim '{}'", args.claim_id)))?;

    let verdict = ctx.claim_evaluator.evaluate(&claim.text, &claim.evidence).await?;
    ctx.store.set_claim_score(&args.claim_id, Some(verdict.score), Some(verdict.reasoning.clone())).await?;

    Ok(serde_json::json!({ "claim_id": args.claim_id, "score": verdict.score, "reasoning": verdict.reasoning }))
}

#[derive(Deserialize)]
struct DeleteClaimArgs {
    id: String,
}

async fn delete_claim(ctx: &ToolContext, arguments: &Value) -> Result<Value> {
    let args: DeleteClaimArgs = parse_args("delete_claim", arguments)?;
    let graph = ctx.store.delete_claim(&args.id).await?;
    Ok(serde_json::json!({ "ok": true, "revision": graph.metadata.revision }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hg_llm::mock::MockChatModel;
    use hypergraph_core::HYPOTHESIS_ID;

    async fn context() -> (tempfile::TempDir, ToolContext) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path());
        store.init("t", "d").await.unwrap();
        let ctx = ToolContext {
            store: Arc::new(store),
            entailment_checker: Arc::new(EntailmentChecker::new(Arc::new(MockChatModel::fixed_text(
                "mock-judge",
                "<analysis>ok</analysis><valid>true</valid><redundant_premises>none</redundant_premises>\
<degenerate_premises>none</degenerate_premises><suggestions>none</suggestions>",
            )))),
            claim_evaluator: Arc::new(ClaimEvaluator::new(Arc::new(MockChatModel::fixed_text(
                "mock-judge",
                "<score>7</score><reasoning>solid evidence</reasoning>",
            )))),
        };
        (dir, ctx)
    }

    #[tokio::test]
    async fn add_claim_then_read_graph_round_trips() {
        let (_dir, ctx) = context().await;
        dispatch(&ctx, "add_claim", &serde_json::json!({"id": "c1", "text": "A holds"})).await.unwrap();
        let result = dispatch(&ctx, "read_graph", &serde_json::json!({})).await.unwrap();
        assert!(result["graph"]["claims"]["c1"]["text"] == "A holds");
    }

    #[tokio::test]
    async fn add_implication_then_check_entailment_writes_status() {
        let (_dir, ctx) = context().await;
        for (id, text) in [(HYPOTHESIS_ID, "X works"), ("c1", "A holds")] {
            dispatch(&ctx, "add_claim", &serde_json::json!({"id": id, "text": text})).await.unwrap();
        }
        dispatch(
            &ctx,
            "add_implication",
            &serde_json::json!({"id": "i1", "premises": ["c1"], "conclusion": HYPOTHESIS_ID, "type": "AND", "reasoning": "r"}),
        )
        .await
        .unwrap();
        dispatch(&ctx, "check_entailment", &serde_json::json!({})).await.unwrap();
        let graph = ctx.store.load().unwrap().0;
        assert_eq!(graph.implications["i1"].entailment_status, hypergraph_core::EntailmentStatus::Passed);
    }

    #[tokio::test]
    async fn evaluate_claim_with_no_evidence_scores_zero_without_calling_the_model() {
        let (_dir, ctx) = context().await;
        dispatch(&ctx, "add_claim", &serde_json::json!({"id": "c1", "text": "A holds"})).await.unwrap();
        let result = dispatch(&ctx, "evaluate_claim", &serde_json::json!({"claim_id": "c1"})).await.unwrap();
        assert_eq!(result["score"], 0.0);
    }

    #[tokio::test]
    async fn unknown_tool_name_is_an_invalid_tool_call_error() {
        let (_dir, ctx) = context().await;
        let err = dispatch(&ctx, "set_score_directly", &serde_json::json!({})).await.unwrap_err();
        assert!(matches!(err, OrchestratorError::InvalidToolCall(_)));
    }

    #[tokio::test]
    async fn delete_claim_removes_it_from_the_graph() {
        let (_dir, ctx) = context().await;
        dispatch(&ctx, "add_claim", &serde_json::json!({"id": "c1", "text": "A holds"})).await.unwrap();
        dispatch(&ctx, "delete_claim", &serde_json::json!({"id": "c1"})).await.unwrap();
        let graph = ctx.store.load().unwrap().0;
        assert!(!graph.claims.contains_key("c1"));
    }
}

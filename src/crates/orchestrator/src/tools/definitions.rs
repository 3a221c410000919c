//! JSON-Schema declarations for the fixed Agent Tool Surface (`§4.4`).
//!
//! Exactly these seven tools are ever declared to the chat model. None of
//! them lets the model write a score or entailment status directly — those
//! fields are produced only by the isolated judges in [`crate::tools::dispatch`].

use hg_llm::ToolDefinition;
use serde_json::json;

pub fn read_graph() -> ToolDefinition {
    ToolDefinition::new(
        "read_graph",
        "Return the current hypergraph (metadata, claims, implications) for this approach.",
        json!({
            "type": "object",
            "properties": {},
        }),
    )
}

pub fn add_claim() -> ToolDefinition {
    ToolDefinition::new(
        "add_claim",
        "Create a new claim with no score and no evidence.",
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string", "description": "Unique claim id, [a-zA-Z0-9_-]{1,128}." },
                "text": { "type": "string", "description": "The claim's natural-language text." },
                "tags": { "type": "array", "items": { "type": "string" } },
                "uncertainties": { "type": "array", "items": { "type": "string" } },
            },
            "required": ["id", "text"],
        }),
    )
}

pub fn add_implication() -> ToolDefinition {
    ToolDefinition::new(
        "add_implication",
        "Create an implication (hyperedge) from premise claims to a conclusion claim. \
Fails if the conclusion already has an implication, or if it would create a cycle.",
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
                "premises": { "type": "array", "items": { "type": "string" }, "minItems": 1 },
                "conclusion": { "type": "string" },
                "type": { "type": "string", "enum": ["AND", "OR"] },
                "reasoning": { "type": "string" },
            },
            "required": ["id", "premises", "conclusion", "type", "reasoning"],
        }),
    )
}

pub fn add_evidence() -> ToolDefinition {
    ToolDefinition::new(
        "add_evidence",
        "Append a validated evidence item to a claim's evidence list.",
        json!({
            "type": "object",
            "properties": {
                "claim_id": { "type": "string" },
                "evidence": {
                    "type": "object",
                    "description": "One of: {kind: simulation, source, lines: {start, end}, code}, \
{kind: literature, source, reference_text}, {kind: calculation, equations, program}.",
                },
            },
            "required": ["claim_id", "evidence"],
        }),
    )
}

pub fn check_entailment() -> ToolDefinition {
    ToolDefinition::new(
        "check_entailment",
        "Run the Entailment Checker over selected implications, or by default every implication \
whose last-checked signature is stale. Writes entailment_status and entailment_explanation.",
        json!({
            "type": "object",
            "properties": {
                "force": { "type": "boolean", "description": "Re-check even if not stale." },
                "implication_ids": { "type": "array", "items": { "type": "string" } },
            },
        }),
    )
}

pub fn evaluate_claim() -> ToolDefinition {
    ToolDefinition::new(
        "evaluate_claim",
        "Run the Claim Evaluator over a claim's attached evidence. Writes score and reasoning.",
        json!({
            "type": "object",
            "properties": {
                "claim_id": { "type": "string" },
            },
            "required": ["claim_id"],
        }),
    )
}

pub fn delete_claim() -> ToolDefinition {
    ToolDefinition::new(
        "delete_claim",
        "Remove a claim and every implication incident on it. The root hypothesis claim cannot be deleted.",
        json!({
            "type": "object",
            "properties": {
                "id": { "type": "string" },
            },
            "required": ["id"],
        }),
    )
}

/// The complete, fixed tool surface declared to the model on every turn.
pub fn all() -> Vec<ToolDefinition> {
    vec![
        read_graph(),
        add_claim(),
        add_implication(),
        add_evidence(),
        check_entailment(),
        evaluate_claim(),
        delete_claim(),
    ]
}

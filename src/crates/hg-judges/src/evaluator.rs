//! The Claim Evaluator (`§4.7`): an isolated LLM judge that scores a claim
//! from its own attached evidence, never from the chat session that
//! created it.

use crate::error::{JudgeError, Result};
use crate::xml;
use hg_llm::{ChatModel, ChatRequest, Message};
use hypergraph_core::Evidence;
use std::sync::Arc;

/// The result of evaluating one claim, ready to be written back through
/// the Store via `set_claim_score`.
#[derive(Debug, Clone)]
pub struct ClaimVerdict {
    pub score: f64,
    pub reasoning: String,
}

pub struct ClaimEvaluator {
    model: Arc<dyn ChatModel>,
}

impl ClaimEvaluator {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Evaluate `claim_text` against `evidence`. A claim with no evidence
    /// is refused outright (score `0`, `§4.7`) without calling the model.
    pub async fn evaluate(&self, claim_text: &str, evidence: &[Evidence]) -> Result<ClaimVerdict> {
        if evidence.is_empty() {
            return Ok(ClaimVerdict {
                score: 0.0,
                reasoning: "no evidence attached; claims with no evidence are scored 0".to_string(),
            });
        }

        let prompt = build_prompt(claim_text, evidence);
        match self.ask(&prompt).await {
            Ok(verdict) => Ok(verdict),
            Err(JudgeError::MalformedOutput(first_error)) => {
                let retry_prompt = format!(
                    "{prompt}\n\nYour previous answer could not be parsed ({first_error}). Reply with \
exactly <score> (a number from 0 to 10) and <reasoning>, each opened and closed once, and nothing else."
                );
                self.ask(&retry_prompt).await
            }
            Err(e) => Err(e),
        }
    }

    async fn ask(&self, prompt: &str) -> Result<ClaimVerdict> {
        let response = self
            .model
            .chat(ChatRequest::new(vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)]))
            .await?;
        parse_verdict(&response.message.text)
    }
}

const SYSTEM_PROMPT: &str = "You are a careful evidence assessor for an entailment hypergraph. \
You score how strongly the given evidence supports the given claim, on a scale from 0 \
(no support) to 10 (conclusively established). You see only the claim text and its attached \
evidence; you do not see any other context about the project. Respond with exactly the \
requested tags and nothing else.";

fn build_prompt(claim_text: &str, evidence: &[Evidence]) -> String {
    let rendered = evidence
        .iter()
        .enumerate()
        .map(|(i, ev)| format!("Evidence {}:\n{}", i + 1, render_evidence(ev)))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "Claim:\n  {claim_text}\n\n{rendered}\n\n\
Score how strongly this evidence supports the claim, from 0 to 10, in <score>. \
Give your reasoning in <reasoning>."
    )
}

fn render_evidence(evidence: &Evidence) -> String {
    match evidence {
        Evidence::Simulation { source, lines, code } => {
            format!("  [simulation] {source}:{}-{}\n```\n{code}\n```", lines.start, lines.end)
        }
        Evidence::Literature { source, reference_text } => {
            format!("  [literature] {source}\n  \"{reference_text}\"")
        }
        Evidence::Calculation { equations, program } => {
            format!("  [calculation]\n  equations: {equations}\n  program:\n```\n{program}\n```")
        }
    }
}

fn parse_verdict(text: &str) -> Result<ClaimVerdict> {
    let score = xml::extract_number_tag(text, "score").ok_or_else(|| JudgeError::MalformedOutput("missing or unparsable <score>".into()))?;
    if !(0.0..=10.0).contains(&score) {
        return Err(JudgeError::MalformedOutput(format!("score {score} out of range [0, 10]")));
    }
    let reasoning = xml::extract_tag(text, "reasoning").ok_or_else(|| JudgeError::MalformedOutput("missing <reasoning>".into()))?;
    Ok(ClaimVerdict { score, reasoning })
}

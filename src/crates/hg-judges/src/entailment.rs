//! The Entailment Checker (`§4.6`): an isolated LLM judge that validates
//! whether one implication's logical step is valid, minimal, and
//! non-degenerate. Its prompt sees only the texts of the premises, the
//! conclusion, and the connective — never the chat session that created
//! the implication (`§9`, "scoring is not a tool-call output").

use crate::error::{JudgeError, Result};
use crate::xml;
use hg_llm::{ChatModel, ChatRequest, Message};
use hypergraph_core::{ConnectiveType, EntailmentExplanation, EntailmentStatus, Implication};
use std::sync::Arc;

/// The verdict of checking one implication, ready to be written back
/// through the Store via `set_implication_entailment`.
#[derive(Debug, Clone)]
pub struct EntailmentVerdict {
    pub status: EntailmentStatus,
    pub explanation: EntailmentExplanation,
    /// Signature computed over the premise/conclusion texts *at check
    /// time*, for stale-entailment drift detection (`§3`, `§8` property 8).
    pub signature: String,
}

pub struct EntailmentChecker {
    model: Arc<dyn ChatModel>,
}

impl EntailmentChecker {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }

    /// Judge one implication given the current texts of its premises and
    /// conclusion. `implication` supplies only the id/connective/premises
    /// list needed to build the prompt and compute the signature; the
    /// caller (the tool surface) is responsible for resolving `premises`
    /// and `conclusion` ids to their current claim texts.
    pub async fn check(
        &self,
        implication: &Implication,
        premise_texts: &[&str],
        conclusion_text: &str,
    ) -> Result<EntailmentVerdict> {
        let signature = implication.compute_signature(premise_texts, conclusion_text);
        let prompt = build_prompt(implication.connective, premise_texts, conclusion_text);

        let explanation = match self.ask(&prompt).await {
            Ok(explanation) => explanation,
            Err(JudgeError::MalformedOutput(first_error)) => {
                let retry_prompt = format!(
                    "{prompt}\n\nYour previous answer could not be parsed ({first_error}). Reply with \
exactly the four tags <analysis>, <valid>, <redundant_premises>, <degenerate_premises>, and \
<suggestions>, each opened and closed once, and nothing else."
                );
                self.ask(&retry_prompt).await?
            }
            Err(e) => return Err(e),
        };

        let status = if explanation.valid && explanation.redundant_premises.is_empty() && explanation.degenerate_premises.is_empty()
        {
            EntailmentStatus::Passed
        } else {
            EntailmentStatus::Failed
        };

        Ok(EntailmentVerdict {
            status,
            explanation,
            signature,
        })
    }

    async fn ask(&self, prompt: &str) -> Result<EntailmentExplanation> {
        let response = self
            .model
            .chat(ChatRequest::new(vec![
                Message::system(SYSTEM_PROMPT),
                Message::user(prompt),
            ]))
            .await?;
        parse_explanation(&response.message.text)
    }
}

const SYSTEM_PROMPT: &str = "You are a rigorous logic referee for an entailment hypergraph. \
You judge a single proposed logical step: do the stated premises, combined with the given \
connective, entail the stated conclusion? You do not see any other context about the project \
this claim belongs to, and you must not try to guess it; judge the step on its own logical \
merits alone. Respond with exactly the requested tags and nothing else.";

fn build_prompt(connective: ConnectiveType, premise_texts: &[&str], conclusion_text: &str) -> String {
    let connective_name = match connective {
        ConnectiveType::And => "AND (the conclusion must follow only if ALL premises hold)",
        ConnectiveType::Or => "OR (the conclusion must follow if ANY ONE premise holds)",
    };
    let premises = premise_texts
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  {}. {p}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Premises (connective: {connective_name}):\n{premises}\n\nConclusion:\n  {conclusion_text}\n\n\
Answer these four questions, each in its own tag:\n\
1. Does the entailment hold? Write a short analysis in <analysis>, then your verdict as \
exactly \"true\" or \"false\" in <valid>.\n\
2. Is any premise redundant? For AND, a premise is redundant if removing it still yields a \
valid entailment. List redundant premise texts, comma-separated, in <redundant_premises>, or \
write \"none\".\n\
3. Is any premise degenerate? A premise is degenerate if the conclusion itself already implies \
that premise, making the step circular/trivial. List degenerate premise texts in \
<degenerate_premises>, or write \"none\".\n\
4. If the step is invalid, redundant, or degenerate, give concrete suggestions to fix it in \
<suggestions>, or write \"none\"."
    )
}

fn parse_explanation(text: &str) -> Result<EntailmentExplanation> {
    let analysis = xml::extract_tag(text, "analysis").ok_or_else(|| JudgeError::MalformedOutput("missing <analysis>".into()))?;
    let valid = xml::extract_bool_tag(text, "valid").ok_or_else(|| JudgeError::MalformedOutput("missing or unparsable <valid>".into()))?;
    let redundant_premises = xml::extract_list_tag(text, "redundant_premises");
    let degenerate_premises = xml::extract_list_tag(text, "degenerate_premises");
    let suggestions = xml::extract_tag(text, "suggestions").unwrap_or_default();

    Ok(EntailmentExplanation {
        analysis,
        valid,
        redundant_premises,
        degenerate_premises,
        suggestions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hg_llm::mock::MockChatModel;
    use hypergraph_core::ConnectiveType;

    fn checker_with_reply(reply: &str) -> EntailmentChecker {
        EntailmentChecker::new(Arc::new(MockChatModel::fixed_text("mock-judge", reply)))
    }

    fn sample_implication() -> Implication {
        Implication::new("i1", vec!["c1".into(), "c2".into()], "hypothesis", ConnectiveType::And, "r")
    }

    #[tokio::test]
    async fn passes_when_valid_and_no_defects() {
        let checker = checker_with_reply(
            "<analysis>Clean AND.</analysis><valid>true</valid><redundant_premises>none</redundant_premises>\
<degenerate_premises>none</degenerate_premises><suggestions>none</suggestions>",
        );
        let verdict = checker.check(&sample_implication(), &["A holds", "B holds"], "X works").await.unwrap();
        assert_eq!(verdict.status, EntailmentStatus::Passed);
    }

    #[tokio::test]
    async fn fails_when_a_premise_is_redundant() {
        let checker = checker_with_reply(
            "<analysis>B alone suffices.</analysis><valid>true</valid><redundant_premises>A holds</redundant_premises>\
<degenerate_premises>none</degenerate_premises><suggestions>drop A</suggestions>",
        );
        let verdict = checker.check(&sample_implication(), &["A holds", "B holds"], "X works").await.unwrap();
        assert_eq!(verdict.status, EntailmentStatus::Failed);
        assert_eq!(verdict.explanation.redundant_premises, vec!["A holds".to_string()]);
    }

    #[tokio::test]
    async fn fails_when_entailment_does_not_hold() {
        let checker = checker_with_reply(
            "<analysis>Premises don't support conclusion.</analysis><valid>false</valid>\
<redundant_premises>none</redundant_premises><degenerate_premises>none</degenerate_premises><suggestions>rework</suggestions>",
        );
        let verdict = checker.check(&sample_implication(), &["A holds"], "X works").await.unwrap();
        assert_eq!(verdict.status, EntailmentStatus::Failed);
    }

    #[tokio::test]
    async fn malformed_output_is_an_error_after_the_retry_also_fails() {
        let checker = checker_with_reply("not xml at all");
        let err = checker.check(&sample_implication(), &["A holds"], "X works").await.unwrap_err();
        assert!(matches!(err, JudgeError::MalformedOutput(_)));
    }

    #[tokio::test]
    async fn a_malformed_first_reply_is_retried_once_before_succeeding() {
        use hg_llm::mock::{MockChatModel, ScriptedTurn};
        let model = MockChatModel::new(
            "mock-judge",
            vec![
                ScriptedTurn::Text("not xml at all".into()),
                ScriptedTurn::Text(
                    "<analysis>Clean AND.</analysis><valid>true</valid><redundant_premises>none</redundant_premises>\
<degenerate_premises>none</degenerate_premises><suggestions>none</suggestions>"
                        .into(),
                ),
            ],
        );
        let checker = EntailmentChecker::new(Arc::new(model));
        let verdict = checker.check(&sample_implication(), &["A holds", "B holds"], "X works").await.unwrap();
        assert_eq!(verdict.status, EntailmentStatus::Passed);
    }

    #[test]
    fn signature_is_order_sensitive_to_connective() {
        let imp_and = Implication::new("i1", vec!["c1".into()], "hypothesis", ConnectiveType::And, "r");
        let imp_or = Implication::new("i1", vec!["c1".into()], "hypothesis", ConnectiveType::Or, "r");
        assert_ne!(
            imp_and.compute_signature(&["A"], "X"),
            imp_or.compute_signature(&["A"], "X")
        );
    }
}

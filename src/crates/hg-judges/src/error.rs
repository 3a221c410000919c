//! Error types for the Entailment Checker and Claim Evaluator (`§7`: "judge
//! failures").

use thiserror::Error;

pub type Result<T> = std::result::Result<T, JudgeError>;

#[derive(Debug, Error)]
pub enum JudgeError {
    /// The model's response could not be parsed into the expected
    /// structured shape (missing XML tags, a score outside `[0, 10]`,
    /// etc). `EntailmentChecker::check` and `ClaimEvaluator::evaluate`
    /// each retry once with a stricter re-prompt before returning this;
    /// seeing it means the retry also failed, and the caller should
    /// surface it as a warning rather than keep retrying (`§7`).
    #[error("could not parse judge output: {0}")]
    MalformedOutput(String),

    /// The model explicitly declined to answer (e.g. a claim with no
    /// evidence, per `§4.7`'s refusal rule).
    #[error("judge refused: {0}")]
    Refused(String),

    #[error("LLM provider error: {0}")]
    Llm(#[from] hg_llm::LlmError),
}

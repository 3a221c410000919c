//! Error taxonomy for the chat loop, Auto Mode, and the HTTP/WS transport (`§7`).

use thiserror::Error;

pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The underlying graph rejected a structural edit. Surfaced to the
    /// model as a tool-call failure it can act on (`§7`).
    #[error("graph error: {0}")]
    Graph(#[from] hypergraph_core::GraphError),

    /// A judge (Entailment Checker / Claim Evaluator) failed to produce a
    /// usable verdict after its retry.
    #[error("judge error: {0}")]
    Judge(#[from] hg_judges::JudgeError),

    /// The model provider itself failed (transport, auth, rate limit).
    #[error("provider error: {0}")]
    Provider(#[from] hg_llm::LlmError),

    /// A tool call named a tool outside the fixed agent tool surface, or
    /// supplied arguments that don't match its schema.
    #[error("unknown or malformed tool call: {0}")]
    InvalidToolCall(String),

    /// An approach name/path did not resolve to a real approach directory.
    #[error("unknown approach: {0}")]
    UnknownApproach(String),

    /// A session already has a turn in flight (`§4.5` concurrency contract).
    #[error("session {0} already has a turn in progress")]
    TurnInProgress(String),

    /// A turn or auto-mode run was aborted by the caller.
    #[error("cancelled")]
    Cancelled,

    /// The per-turn tool-call budget (`§4.5`, `§6` configuration) was
    /// exceeded before the model emitted a final stop.
    #[error("tool-call budget of {0} exhausted for this turn")]
    ToolBudgetExhausted(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

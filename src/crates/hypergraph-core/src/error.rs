//! Error taxonomy for the hypergraph store and validator (`§7`).
//!
//! Every variant here is recoverable: a caller (ultimately the tool surface)
//! can render it back to the model as a tool-call failure the agent can act
//! on. The store never leaves a partially-written `hypergraph.json` behind
//! when any of these are returned.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Structural validation failed; carries the fatal errors the Validator
    /// produced.
    #[error("invalid graph: {0:?}")]
    InvalidGraph(Vec<String>),

    #[error("unknown id: {0:?}")]
    UnknownId(String),

    #[error("duplicate id: {0:?}")]
    DuplicateId(String),

    #[error("claim {0:?} already has a conclusion-implication")]
    ConclusionAlreadyClaimed(String),

    #[error("adding implication {0:?} would introduce a cycle")]
    CycleDetected(String),

    #[error("evidence for claim {claim_id:?} does not match {source:?} at lines {lines:?}")]
    EvidenceMismatch {
        claim_id: String,
        source: String,
        lines: (usize, usize),
    },

    #[error("the root hypothesis claim's text is immutable once created")]
    HypothesisImmutable,

    #[error("id {0:?} does not match the required grammar")]
    InvalidIdGrammar(String),

    #[error("no history snapshot found for timestamp {0:?}")]
    HistoryNotFound(String),

    #[error("approach lock timed out")]
    LockTimeout,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

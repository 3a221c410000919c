//! Hypergraph data store, schema validator, and cost-propagation engine
//! (`§4.1`-`§4.3`).
//!
//! This crate owns the on-disk representation of one approach's
//! `hypergraph.json`: the [`domain`] types, the [`validator`] that enforces
//! the structural invariants of `§3`, the [`cost`] engine that turns scores
//! and entailment status into propagated epistemic costs, and the
//! [`store::Store`] that ties load/validate/save/history together behind a
//! narrow, atomic interface. It depends on `hypergraph-history` for version
//! snapshots and on `hg-types` for shared id/time primitives, and on
//! nothing that knows about LLMs, tool calls, or chat sessions — those live
//! in `hg-judges` and `orchestrator`.

pub mod cost;
pub mod domain;
pub mod error;
pub mod lock;
pub mod store;
pub mod validator;

pub use domain::{
    ApproachMetadata, Claim, ConnectiveType, CostValue, EntailmentExplanation, EntailmentStatus, Evidence,
    Hypergraph, Implication, LineRange, ValidationSummary, HYPOTHESIS_ID,
};
pub use error::{GraphError, Result};
pub use store::{ChangeNotification, Store};
pub use validator::ValidationReport;

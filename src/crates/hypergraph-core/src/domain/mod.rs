//! The entailment hypergraph's data model (`§3`).

pub mod claim;
pub mod evidence;
pub mod graph;
pub mod implication;

pub use claim::{Claim, CostValue};
pub use evidence::{Evidence, LineRange};
pub use graph::{ApproachMetadata, Hypergraph, ValidationSummary, HYPOTHESIS_ID};
pub use implication::{ConnectiveType, EntailmentExplanation, EntailmentStatus, Implication};

//! Identifier grammar shared by claims and implications.
//!
//! Id shape is otherwise unspecified by the wire format; this workspace
//! fixes it as a structural invariant so the Validator has one place to
//! enforce it and every crate that mints or checks an id agrees on the rule.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// The reserved id of the root hypothesis claim (invariant 7 of the data model).
pub const HYPOTHESIS_ID: &str = "hypothesis";

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").unwrap())
}

/// Error returned when a claim or implication id does not match the grammar.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("id {0:?} does not match the required pattern ^[A-Za-z0-9_-]{{1,128}}$")]
pub struct InvalidId(pub String);

/// Validate a claim or implication id against the shared grammar.
///
/// Ids must be 1-128 characters drawn from `[A-Za-z0-9_-]`. This keeps ids
/// safe to use as JSON object keys, filesystem-adjacent history keys, and
/// tool-call arguments without further escaping.
pub fn validate_id(id: &str) -> Result<(), InvalidId> {
    if id_pattern().is_match(id) {
        Ok(())
    } else {
        Err(InvalidId(id.to_string()))
    }
}

/// True iff `id` is the reserved root-hypothesis id.
pub fn is_hypothesis_id(id: &str) -> bool {
    id == HYPOTHESIS_ID
}

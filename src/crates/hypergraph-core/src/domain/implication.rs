//! The implication: a hyperedge from a set of premise claims to one
//! conclusion claim, labeled AND or OR.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// The logical connective joining an implication's premises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConnectiveType {
    And,
    Or,
}

/// Verdict of the Entailment Checker (`§4.6`) for one implication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntailmentStatus {
    #[default]
    Unchecked,
    Passed,
    Failed,
}

/// The checker's structured explanation, one field per judged question.
///
/// Mirrors the tagged-XML sections the judge prompt asks for; the checker
/// parses the model's raw XML into this struct before it is written back
/// through the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntailmentExplanation {
    #[serde(default)]
    pub analysis: String,
    #[serde(default)]
    pub valid: bool,
    #[serde(default)]
    pub redundant_premises: Vec<String>,
    #[serde(default)]
    pub degenerate_premises: Vec<String>,
    #[serde(default)]
    pub suggestions: String,
}

/// A hyperedge from `premises` to `conclusion`, labeled AND or OR.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Implication {
    pub id: String,
    /// Claim ids; must contain at least one entry (enforced by the Validator).
    pub premises: Vec<String>,
    pub conclusion: String,
    #[serde(rename = "type")]
    pub connective: ConnectiveType,
    pub reasoning: String,
    #[serde(default)]
    pub entailment_status: EntailmentStatus,
    #[serde(default)]
    pub entailment_explanation: Option<EntailmentExplanation>,
    /// Hash of `(premise texts, conclusion text, connective)` at the time
    /// this implication was last checked; used to detect drift (`§3`, `§8`
    /// property 8).
    #[serde(default)]
    pub last_checked_signature: Option<String>,
}

impl Implication {
    pub fn new(
        id: impl Into<String>,
        premises: Vec<String>,
        conclusion: impl Into<String>,
        connective: ConnectiveType,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            premises,
            conclusion: conclusion.into(),
            connective,
            reasoning: reasoning.into(),
            entailment_status: EntailmentStatus::Unchecked,
            entailment_explanation: None,
            last_checked_signature: None,
        }
    }

    /// Compute the drift-detection signature over the *current* texts of
    /// `premise_texts` (in `self.premises` order) and `conclusion_text`.
    pub fn compute_signature(&self, premise_texts: &[&str], conclusion_text: &str) -> String {
        let mut hasher = DefaultHasher::new();
        for t in premise_texts {
            t.hash(&mut hasher);
        }
        conclusion_text.hash(&mut hasher);
        self.connective.hash_discriminant().hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    /// `true` if this implication's last-checked signature is absent or no
    /// longer matches the current premise/conclusion texts (stale entailment,
    /// `§4.2`, `§8` property 8).
    pub fn is_stale(&self, premise_texts: &[&str], conclusion_text: &str) -> bool {
        match &self.last_checked_signature {
            None => self.entailment_status != EntailmentStatus::Unchecked,
            Some(sig) => *sig != self.compute_signature(premise_texts, conclusion_text),
        }
    }
}

impl ConnectiveType {
    fn hash_discriminant(&self) -> u8 {
        match self {
            ConnectiveType::And => 0,
            ConnectiveType::Or => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_changes_when_text_changes() {
        let imp = Implication::new("i1", vec!["c1".into()], "hypothesis", ConnectiveType::And, "r");
        let sig_a = imp.compute_signature(&["A holds"], "X works");
        let sig_b = imp.compute_signature(&["A holds, revised"], "X works");
        assert_ne!(sig_a, sig_b);
    }

    #[test]
    fn unchecked_with_no_signature_is_not_flagged_stale() {
        let imp = Implication::new("i1", vec!["c1".into()], "hypothesis", ConnectiveType::And, "r");
        assert!(!imp.is_stale(&["A holds"], "X works"));
    }

    #[test]
    fn passed_implication_without_signature_is_stale() {
        let mut imp = Implication::new("i1", vec!["c1".into()], "hypothesis", ConnectiveType::And, "r");
        imp.entailment_status = EntailmentStatus::Passed;
        assert!(imp.is_stale(&["A holds"], "X works"));
    }
}

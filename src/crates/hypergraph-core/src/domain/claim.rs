//! The claim: an atomic natural-language statement the system scores.

use super::evidence::Evidence;
use serde::{Deserialize, Serialize};

/// A natural-language claim and everything the graph knows about it.
///
/// `cost`, `evidence_epistemic_cost`, and `experimental_epistemic_cost` are
/// not authored directly; they are recomputed by the cost engine on every
/// `save()` (`§4.3`) and cached here purely so a snapshot read doesn't need
/// to re-run propagation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub id: String,
    pub text: String,
    /// Truth score in `[0, 10]`, or `None` meaning "unscored".
    #[serde(default)]
    pub score: Option<f64>,
    /// Free-text rationale for the score, written by the Claim Evaluator.
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub evidence: Vec<Evidence>,
    #[serde(default)]
    pub uncertainties: Option<Vec<String>>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,

    /// Cached, derived: `-log2(score/10)` of this claim's own score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence_epistemic_cost: Option<CostValue>,
    /// Cached, derived: cost aggregated from premises through this claim's
    /// conclusion-implication, if it has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental_epistemic_cost: Option<CostValue>,
    /// Cached, derived: `min(evidence, experimental)` of the two above.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<CostValue>,
}

impl Claim {
    /// A freshly created claim: no score, no evidence, no cached costs.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            score: None,
            reasoning: None,
            evidence: Vec::new(),
            uncertainties: None,
            tags: None,
            evidence_epistemic_cost: None,
            experimental_epistemic_cost: None,
            cost: None,
        }
    }

    pub fn with_score(mut self, score: f64, reasoning: impl Into<String>) -> Self {
        self.score = Some(score);
        self.reasoning = Some(reasoning.into());
        self
    }
}

/// A cost value that may be `+Infinity`, serialized as the JSON string
/// `"Infinity"` for wire portability (`§4.3`, `§6`) since `f64::INFINITY`
/// is not valid JSON.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(into = "CostWire", try_from = "CostWire")]
pub struct CostValue(pub f64);

impl CostValue {
    pub const INFINITY: CostValue = CostValue(f64::INFINITY);
    pub const ZERO: CostValue = CostValue(0.0);

    pub fn finite(v: f64) -> Self {
        CostValue(v)
    }

    pub fn is_infinite(&self) -> bool {
        self.0.is_infinite()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum CostWire {
    Number(f64),
    Tag(String),
}

impl From<CostValue> for CostWire {
    fn from(v: CostValue) -> Self {
        if v.0.is_infinite() {
            CostWire::Tag(if v.0 > 0.0 { "Infinity" } else { "-Infinity" }.to_string())
        } else {
            CostWire::Number(v.0)
        }
    }
}

impl TryFrom<CostWire> for CostValue {
    type Error = std::num::ParseFloatError;

    fn try_from(w: CostWire) -> Result<Self, Self::Error> {
        match w {
            CostWire::Number(n) => Ok(CostValue(n)),
            CostWire::Tag(s) if s == "Infinity" => Ok(CostValue(f64::INFINITY)),
            CostWire::Tag(s) if s == "-Infinity" => Ok(CostValue(f64::NEG_INFINITY)),
            CostWire::Tag(s) => s.parse::<f64>().map(CostValue),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinity_serializes_as_string() {
        let v = CostValue::INFINITY;
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "\"Infinity\"");
        let back: CostValue = serde_json::from_str(&json).unwrap();
        assert!(back.is_infinite());
    }

    #[test]
    fn finite_cost_serializes_as_number() {
        let v = CostValue::finite(0.474);
        let json = serde_json::to_string(&v).unwrap();
        assert_eq!(json, "0.474");
    }
}

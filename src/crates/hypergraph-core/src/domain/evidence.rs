//! Evidence attached to a claim: simulation code, literature quotation, or a
//! closed-form calculation. See §3 (Data Model).

use serde::{Deserialize, Serialize};

/// A single evidence item backing a claim's score.
///
/// Tagged on `kind` so that JSON on disk is self-describing and a claim's
/// `evidence` array can mix all three variants freely (invariant 5: shape
/// must match one of the three variants exactly).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    /// A cited slice of a source file, expected to byte-exactly match the
    /// file at validation time (see `EvidenceMismatch`).
    Simulation {
        /// Path to the source file, relative to the approach directory.
        source: String,
        /// Inclusive 1-indexed line range the snippet was extracted from.
        lines: LineRange,
        /// The extracted snippet itself.
        code: String,
    },
    /// A literature citation plus the exact quoted text.
    Literature {
        source: String,
        reference_text: String,
    },
    /// A closed-form calculation: the LaTeX equations plus a self-contained
    /// program that computes the numeric result.
    Calculation { equations: String, program: String },
}

impl Evidence {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Evidence::Simulation { .. } => "simulation",
            Evidence::Literature { .. } => "literature",
            Evidence::Calculation { .. } => "calculation",
        }
    }
}

/// An inclusive, 1-indexed line range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Extract the inclusive `[start, end]` 1-indexed slice of `text`'s lines.
    ///
    /// Returns `None` if the range is empty or out of bounds, which the
    /// Validator treats as an evidence mismatch rather than panicking.
    pub fn slice<'a>(&self, text: &'a str) -> Option<String> {
        if self.start == 0 || self.start > self.end {
            return None;
        }
        let lines: Vec<&str> = text.lines().collect();
        if self.end > lines.len() {
            return None;
        }
        Some(lines[self.start - 1..self.end].join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_extracts_inclusive_range() {
        let text = "a\nb\nc\nd\n";
        let range = LineRange::new(2, 3);
        assert_eq!(range.slice(text).as_deref(), Some("b\nc"));
    }

    #[test]
    fn slice_rejects_out_of_bounds() {
        let text = "a\nb\n";
        assert!(LineRange::new(1, 10).slice(text).is_none());
        assert!(LineRange::new(0, 1).slice(text).is_none());
        assert!(LineRange::new(3, 2).slice(text).is_none());
    }

    #[test]
    fn evidence_round_trips_through_json() {
        let ev = Evidence::Simulation {
            source: "simulations/run.py".into(),
            lines: LineRange::new(1, 2),
            code: "a\nb".into(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        let back: Evidence = serde_json::from_str(&json).unwrap();
        assert_eq!(ev, back);
    }
}

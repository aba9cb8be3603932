//! Span-level detection agreement, independent of attributes.
//!
//! For a pair, the left annotator serves as reference: a row marked by both
//! is a true positive, left-only a false negative, right-only a false
//! positive. F1 is symmetric in the pair.

use crate::agreement::Score;
use crate::align::AlignedTable;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionScores {
    pub left: String,
    pub right: String,
    pub matched: u64,
    pub left_only: u64,
    pub right_only: u64,
    pub precision: Score,
    pub recall: Score,
    pub f1: Score,
}

impl DetectionScores {
    pub fn from_counts(
        left: impl Into<String>,
        right: impl Into<String>,
        matched: u64,
        left_only: u64,
        right_only: u64,
    ) -> Self {
        let ratio = |num: u64, den: u64| {
            if den == 0 {
                Score::not_computable("no mentions")
            } else {
                Score::value(num as f64 / den as f64)
            }
        };
        Self {
            left: left.into(),
            right: right.into(),
            matched,
            left_only,
            right_only,
            precision: ratio(matched, matched + right_only),
            recall: ratio(matched, matched + left_only),
            f1: ratio(2 * matched, 2 * matched + left_only + right_only),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub pairs: Vec<DetectionScores>,
    pub macro_precision: Score,
    pub macro_recall: Score,
    pub macro_f1: Score,
}

/// Detection scores for every column pair of `table`.
///
/// Only rows where both annotators participate are counted.
pub fn detection_summary(table: &AlignedTable) -> DetectionSummary {
    let n = table.annotators.len();
    let mut pairs = Vec::new();
    for i in 0..n {
        for j in i + 1..n {
            let (mut matched, mut left_only, mut right_only) = (0, 0, 0);
            for row in &table.rows {
                let (a, b) = (&row.cells[i], &row.cells[j]);
                if !(a.participates() && b.participates()) {
                    continue;
                }
                match (a.mention().is_some(), b.mention().is_some()) {
                    (true, true) => matched += 1,
                    (true, false) => left_only += 1,
                    (false, true) => right_only += 1,
                    (false, false) => {}
                }
            }
            pairs.push(DetectionScores::from_counts(
                &table.annotators[i],
                &table.annotators[j],
                matched,
                left_only,
                right_only,
            ));
        }
    }

    DetectionSummary {
        macro_precision: Score::mean(pairs.iter().map(|p| &p.precision)),
        macro_recall: Score::mean(pairs.iter().map(|p| &p.recall)),
        macro_f1: Score::mean(pairs.iter().map(|p| &p.f1)),
        pairs,
    }
}

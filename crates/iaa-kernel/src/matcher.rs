//! Mention matching between two annotators of one document.
//!
//! Two phases, both deterministic:
//!
//! 1. **Exact**: identical spans pair up in ascending (start, end) order; the
//!    k-th occurrence of a span on one side pairs with the k-th on the other.
//! 2. **Fallback** (optional): the remaining mentions are scored pairwise by
//!    overlap ratio and accepted greedily in descending score order, ties
//!    broken by ascending start of the left mention, then of the right. With
//!    a head threshold set, overlapping pairs whose head sets reach it are
//!    accepted first, ranked by head Dice; span overlap only decides the rest.
//!
//! The greedy phase is locally optimal only. It is not a maximum-weight
//! bipartite assignment; it trades optimality for reproducible tie-breaks.
//!
//! Matches refer to mentions by index into the input slices. The inputs are
//! never modified.

use crate::config::OverlapMeasure;
use crate::error::IaaError;
use crate::mention::{Mention, Span};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Matching parameters for one pair of mention lists.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOptions {
    /// Run the overlap phase after the exact phase.
    pub fallback: bool,

    /// Minimum score, inclusive, for an overlap pair.
    pub min_overlap_threshold: f64,

    pub measure: OverlapMeasure,

    /// Skip pairs whose sentence indices are both known and differ.
    pub same_sentence_only: bool,

    /// Minimum head-set Dice, inclusive, for a head pair. `None` disables heads.
    pub head_threshold: Option<f64>,
}

impl Default for MatchOptions {
    fn default() -> Self {
        Self {
            fallback: false,
            min_overlap_threshold: 0.5,
            measure: OverlapMeasure::Jaccard,
            same_sentence_only: true,
            head_threshold: None,
        }
    }
}

impl MatchOptions {
    pub fn exact_only() -> Self {
        Self::default()
    }

    pub fn with_fallback(threshold: f64) -> Self {
        Self {
            fallback: true,
            min_overlap_threshold: threshold,
            ..Self::default()
        }
    }

    pub fn measure(mut self, measure: OverlapMeasure) -> Self {
        self.measure = measure;
        self
    }

    pub fn heads(mut self, threshold: f64) -> Self {
        self.head_threshold = Some(threshold);
        self
    }
}

/// One entry of a match set. At most one side is ever missing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Match {
    Exact { left: usize, right: usize },
    /// Paired on head-set Dice; the spans overlap but differ.
    Head { left: usize, right: usize, score: f64 },
    Overlap { left: usize, right: usize, score: f64 },
    LeftOnly { left: usize },
    RightOnly { right: usize },
}

impl Match {
    pub fn left(&self) -> Option<usize> {
        match *self {
            Self::Exact { left, .. }
            | Self::Head { left, .. }
            | Self::Overlap { left, .. }
            | Self::LeftOnly { left } => Some(left),
            Self::RightOnly { .. } => None,
        }
    }

    pub fn right(&self) -> Option<usize> {
        match *self {
            Self::Exact { right, .. }
            | Self::Head { right, .. }
            | Self::Overlap { right, .. }
            | Self::RightOnly { right } => Some(right),
            Self::LeftOnly { .. } => None,
        }
    }

    pub fn is_paired(&self) -> bool {
        matches!(
            self,
            Self::Exact { .. } | Self::Head { .. } | Self::Overlap { .. }
        )
    }

    /// Score of a paired match; exact matches score 1.
    pub fn score(&self) -> Option<f64> {
        match *self {
            Self::Exact { .. } => Some(1.0),
            Self::Head { score, .. } | Self::Overlap { score, .. } => Some(score),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Exact { .. } | Self::Head { .. } | Self::Overlap { .. } => 0,
            Self::LeftOnly { .. } => 1,
            Self::RightOnly { .. } => 2,
        }
    }
}

/// The complete outcome of matching two mention lists: paired entries plus
/// one-sided residuals, ordered by the span of their anchoring mention.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSet {
    pub matches: Vec<Match>,
}

impl MatchSet {
    pub fn iter(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter()
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn paired_count(&self) -> usize {
        self.matches.iter().filter(|m| m.is_paired()).count()
    }

    pub fn left_only_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| matches!(m, Match::LeftOnly { .. }))
            .count()
    }

    pub fn right_only_count(&self) -> usize {
        self.matches
            .iter()
            .filter(|m| matches!(m, Match::RightOnly { .. }))
            .count()
    }

    /// The right-hand partner of left mention `left`, if paired.
    pub fn partner_of_left(&self, left: usize) -> Option<usize> {
        self.matches
            .iter()
            .find(|m| m.is_paired() && m.left() == Some(left))
            .and_then(Match::right)
    }
}

/// Overlap ratio of two spans under `measure`.
pub fn overlap_score(a: &Span, b: &Span, measure: OverlapMeasure) -> f64 {
    match measure {
        OverlapMeasure::Jaccard => a.jaccard(b),
        OverlapMeasure::Dice => a.dice(b),
    }
}

/// Fail on the first mention whose span is malformed.
pub fn validate_mentions(mentions: &[Mention]) -> Result<(), IaaError> {
    mentions.iter().try_for_each(Mention::validate)
}

/// Indices of `mentions` in ascending (start, end, list position) order.
pub(crate) fn span_order(mentions: &[Mention]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..mentions.len()).collect();
    order.sort_by_key(|&i| (mentions[i].span, i));
    order
}

struct Candidate {
    left: usize,
    right: usize,
    /// Head pairs sort ahead of span pairs.
    by_heads: bool,
    score: f64,
}

impl Candidate {
    fn into_match(self) -> Match {
        let (left, right, score) = (self.left, self.right, self.score);
        if self.by_heads {
            Match::Head { left, right, score }
        } else {
            Match::Overlap { left, right, score }
        }
    }
}

/// Fallback candidate for one unmatched pair, if it qualifies.
fn candidate(
    left: &[Mention],
    right: &[Mention],
    l: usize,
    r: usize,
    options: &MatchOptions,
) -> Option<Candidate> {
    let (a, b) = (&left[l], &right[r]);
    if options.same_sentence_only && a.sentence_differs(b) {
        return None;
    }
    if a.span.intersection(&b.span) == 0 {
        return None;
    }
    if let Some(head) = options
        .head_threshold
        .and_then(|t| a.head_dice(b).filter(|&score| score >= t))
    {
        return Some(Candidate {
            left: l,
            right: r,
            by_heads: true,
            score: head,
        });
    }
    let score = overlap_score(&a.span, &b.span, options.measure);
    (score >= options.min_overlap_threshold).then_some(Candidate {
        left: l,
        right: r,
        by_heads: false,
        score,
    })
}

/// Pair the mentions of two annotators for one document.
///
/// Pure: equal inputs give equal outputs, and permuting either list only
/// permutes the indices in the result (for lists without duplicate spans).
pub fn match_mentions(
    left: &[Mention],
    right: &[Mention],
    options: &MatchOptions,
) -> Result<MatchSet, IaaError> {
    validate_mentions(left)?;
    validate_mentions(right)?;

    let left_order = span_order(left);
    let right_order = span_order(right);
    let mut left_taken = vec![false; left.len()];
    let mut right_taken = vec![false; right.len()];
    let mut matches = Vec::new();

    // Exact phase: merge walk over both span-sorted lists.
    let (mut i, mut j) = (0, 0);
    while i < left_order.len() && j < right_order.len() {
        let (l, r) = (left_order[i], right_order[j]);
        match left[l].span.cmp(&right[r].span) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                matches.push(Match::Exact { left: l, right: r });
                left_taken[l] = true;
                right_taken[r] = true;
                i += 1;
                j += 1;
            }
        }
    }

    if options.fallback {
        let mut candidates = Vec::new();
        for &l in left_order.iter().filter(|&&l| !left_taken[l]) {
            for &r in right_order.iter().filter(|&&r| !right_taken[r]) {
                candidates.extend(candidate(left, right, l, r, options));
            }
        }

        candidates.sort_by(|x, y| {
            y.by_heads
                .cmp(&x.by_heads)
                .then_with(|| y.score.total_cmp(&x.score))
                .then_with(|| left[x.left].span.start.cmp(&left[y.left].span.start))
                .then_with(|| right[x.right].span.start.cmp(&right[y.right].span.start))
                .then_with(|| left[x.left].span.end.cmp(&left[y.left].span.end))
                .then_with(|| right[x.right].span.end.cmp(&right[y.right].span.end))
                .then_with(|| x.left.cmp(&y.left))
                .then_with(|| x.right.cmp(&y.right))
        });

        for c in candidates {
            if left_taken[c.left] || right_taken[c.right] {
                continue;
            }
            left_taken[c.left] = true;
            right_taken[c.right] = true;
            matches.push(c.into_match());
        }
    }

    matches.extend(
        left_order
            .iter()
            .filter(|&&l| !left_taken[l])
            .map(|&left| Match::LeftOnly { left }),
    );
    matches.extend(
        right_order
            .iter()
            .filter(|&&r| !right_taken[r])
            .map(|&right| Match::RightOnly { right }),
    );

    let anchor = |m: &Match| -> Span {
        match *m {
            Match::Exact { left: l, .. }
            | Match::Head { left: l, .. }
            | Match::Overlap { left: l, .. }
            | Match::LeftOnly { left: l } => left[l].span,
            Match::RightOnly { right: r } => right[r].span,
        }
    };
    matches.sort_by(|x, y| {
        anchor(x)
            .cmp(&anchor(y))
            .then_with(|| x.rank().cmp(&y.rank()))
            .then_with(|| x.left().cmp(&y.left()))
            .then_with(|| x.right().cmp(&y.right()))
    });

    Ok(MatchSet { matches })
}

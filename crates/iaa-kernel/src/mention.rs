//! Mentions: annotated text spans with attribute assignments.

use crate::error::IaaError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A half-open character range `[start, end)` into the document text.
///
/// Offsets are signed so that malformed input survives deserialization and
/// is rejected by [`Span::validate`] instead of by the parser.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Span {
    pub start: i64,
    pub end: i64,
}

impl Span {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// `0 <= start < end`.
    pub fn is_well_formed(&self) -> bool {
        self.start >= 0 && self.start < self.end
    }

    /// Number of offsets covered by the span.
    pub fn width(&self) -> i64 {
        self.end.saturating_sub(self.start).max(0)
    }

    /// Number of offsets shared with `other`.
    pub fn intersection(&self, other: &Span) -> i64 {
        self.end
            .min(other.end)
            .saturating_sub(self.start.max(other.start))
            .max(0)
    }

    /// `|a ∩ b| / |a ∪ b|` over the offset sets. Zero for disjoint spans.
    pub fn jaccard(&self, other: &Span) -> f64 {
        let shared = self.intersection(other);
        if shared == 0 {
            return 0.0;
        }
        // Overlapping spans have a contiguous union.
        let union = self
            .end
            .max(other.end)
            .saturating_sub(self.start.min(other.start));
        shared as f64 / union as f64
    }

    /// `2|a ∩ b| / (|a| + |b|)` over the offset sets. Zero for disjoint spans.
    pub fn dice(&self, other: &Span) -> f64 {
        let shared = self.intersection(other);
        if shared == 0 {
            return 0.0;
        }
        let total = self.width() as f64 + other.width() as f64;
        2.0 * shared as f64 / total
    }
}

impl std::fmt::Display for Span {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// The value an annotator assigned to one attribute.
///
/// Serialized as the label string, or `null` for [`AttributeValue::Absent`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "Option<String>")]
pub enum AttributeValue {
    Label(String),
    Absent,
}

impl AttributeValue {
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Self::Label(label) => Some(label),
            Self::Absent => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl From<Option<String>> for AttributeValue {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Absent, Self::Label)
    }
}

impl From<AttributeValue> for Option<String> {
    fn from(value: AttributeValue) -> Self {
        match value {
            AttributeValue::Label(label) => Some(label),
            AttributeValue::Absent => None,
        }
    }
}

/// One event mention by one annotator in one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    /// Opaque identifier from the source annotation, for traceability.
    #[serde(rename = "id")]
    pub source_id: String,

    #[serde(flatten)]
    pub span: Span,

    /// Home sentence index, when the source format records one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<u32>,

    /// Surface string, carried for reports only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// Syntactic head tokens, as identifiers produced by an upstream parser.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub heads: BTreeSet<String>,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Mention {
    pub fn new(source_id: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            source_id: source_id.into(),
            span: Span::new(start, end),
            sentence: None,
            text: None,
            heads: BTreeSet::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, label: impl Into<String>) -> Self {
        self.attributes
            .insert(name.into(), AttributeValue::label(label));
        self
    }

    pub fn with_absent(mut self, name: impl Into<String>) -> Self {
        self.attributes.insert(name.into(), AttributeValue::Absent);
        self
    }

    pub fn in_sentence(mut self, sentence: u32) -> Self {
        self.sentence = Some(sentence);
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn with_heads<I, S>(mut self, heads: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.heads = heads.into_iter().map(Into::into).collect();
        self
    }

    /// Dice coefficient over the two head sets; `None` unless both have heads.
    pub fn head_dice(&self, other: &Mention) -> Option<f64> {
        if self.heads.is_empty() || other.heads.is_empty() {
            return None;
        }
        let shared = self.heads.intersection(&other.heads).count();
        Some(2.0 * shared as f64 / (self.heads.len() + other.heads.len()) as f64)
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    /// Reject spans that violate `0 <= start < end`.
    pub fn validate(&self) -> Result<(), IaaError> {
        if self.span.is_well_formed() {
            Ok(())
        } else {
            Err(IaaError::MalformedMention {
                source_id: self.source_id.clone(),
                start: self.span.start,
                end: self.span.end,
            })
        }
    }

    /// Whether two mentions are known to sit in different sentences.
    pub fn sentence_differs(&self, other: &Mention) -> bool {
        matches!((self.sentence, other.sentence), (Some(a), Some(b)) if a != b)
    }
}

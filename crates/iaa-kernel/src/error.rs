//! Error types and run diagnostics.
//!
//! Per-document and per-attribute failures never abort a run. They are
//! turned into [`Diagnostic`] records and reported next to the results.
//! Only an empty corpus and an invalid configuration are fatal.

use crate::document::DocumentId;
use serde::{Deserialize, Serialize};

/// Errors raised by kernel operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IaaError {
    /// A span violates `0 <= start < end`.
    #[error("malformed mention `{source_id}`: span [{start}, {end}) is not a valid half-open range")]
    MalformedMention {
        source_id: String,
        start: i64,
        end: i64,
    },

    /// A label is outside the configured label set of its attribute.
    #[error("mention `{source_id}`: label `{label}` is not allowed for attribute `{attribute}`")]
    InvalidLabel {
        attribute: String,
        label: String,
        source_id: String,
    },

    /// Fewer than two annotators have data for a document.
    #[error("document `{document}`: {found} participating annotator(s), at least 2 required")]
    InsufficientAnnotators { document: String, found: usize },

    /// A requested attribute is missing from a mention and completeness is required.
    #[error("attribute `{attribute}` missing on mention `{source_id}` by `{annotator}`")]
    UnknownAttribute {
        attribute: String,
        annotator: String,
        source_id: String,
    },

    /// No document survived alignment.
    #[error("empty corpus: no usable documents")]
    EmptyCorpus,

    /// The run configuration was rejected before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Classification of a recorded failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    MalformedMention,
    InvalidLabel,
    InsufficientAnnotators,
    UnknownAttribute,
    EmptyCorpus,
    InvalidConfig,
}

impl From<&IaaError> for DiagnosticKind {
    fn from(error: &IaaError) -> Self {
        match error {
            IaaError::MalformedMention { .. } => Self::MalformedMention,
            IaaError::InvalidLabel { .. } => Self::InvalidLabel,
            IaaError::InsufficientAnnotators { .. } => Self::InsufficientAnnotators,
            IaaError::UnknownAttribute { .. } => Self::UnknownAttribute,
            IaaError::EmptyCorpus => Self::EmptyCorpus,
            IaaError::InvalidConfig(_) => Self::InvalidConfig,
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::MalformedMention => "malformed_mention",
            Self::InvalidLabel => "invalid_label",
            Self::InsufficientAnnotators => "insufficient_annotators",
            Self::UnknownAttribute => "unknown_attribute",
            Self::EmptyCorpus => "empty_corpus",
            Self::InvalidConfig => "invalid_config",
        };
        f.write_str(name)
    }
}

/// A skipped document or aborted attribute, kept for the final report.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<DocumentId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    pub message: String,
}

impl Diagnostic {
    /// A document excluded from the corpus table.
    pub fn for_document(document: &DocumentId, error: &IaaError) -> Self {
        Self {
            kind: error.into(),
            document: Some(document.clone()),
            attribute: None,
            message: error.to_string(),
        }
    }

    /// An attribute whose computation was aborted.
    pub fn for_attribute(attribute: &str, error: &IaaError) -> Self {
        Self {
            kind: error.into(),
            document: None,
            attribute: Some(attribute.to_string()),
            message: error.to_string(),
        }
    }
}

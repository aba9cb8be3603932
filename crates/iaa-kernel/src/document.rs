//! Documents: one text, several independent annotators.

use crate::mention::Mention;
use serde::{Deserialize, Serialize};

/// Opaque document identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One annotator's mention list for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorMentions {
    pub name: String,

    #[serde(default)]
    pub mentions: Vec<Mention>,
}

/// A document with its per-annotator mention lists, in annotator order.
///
/// All mention lists index into the same underlying text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,

    #[serde(default)]
    pub annotators: Vec<AnnotatorMentions>,
}

impl Document {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: DocumentId::new(id),
            annotators: Vec::new(),
        }
    }

    pub fn with_annotator(mut self, name: impl Into<String>, mentions: Vec<Mention>) -> Self {
        self.annotators.push(AnnotatorMentions {
            name: name.into(),
            mentions,
        });
        self
    }

    pub fn annotator_names(&self) -> impl Iterator<Item = &str> {
        self.annotators.iter().map(|a| a.name.as_str())
    }

    /// The mention list of `annotator`, or `None` when it has no data here.
    pub fn mentions_of(&self, annotator: &str) -> Option<&[Mention]> {
        self.annotators
            .iter()
            .find(|a| a.name == annotator)
            .map(|a| a.mentions.as_slice())
    }

    pub fn mention_count(&self) -> usize {
        self.annotators.iter().map(|a| a.mentions.len()).sum()
    }
}

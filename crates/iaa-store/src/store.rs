//! The validated corpus handed to the kernel.

use crate::error::StoreError;
use crate::jsonl::read_documents_from_path;
use crate::layout::load_corpus_dir;
use iaa_kernel::Document;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// Documents for one run, in deterministic order, with unique document ids
/// and unique annotator names per document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentStore {
    source: PathBuf,
    documents: Vec<Document>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatorSummary {
    pub name: String,
    pub documents: usize,
    pub mentions: usize,
}

/// What a corpus contains, for `inspect`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorpusSummary {
    pub source: String,
    pub documents: usize,
    pub mentions: usize,
    /// In first-appearance order.
    pub annotators: Vec<AnnotatorSummary>,
    /// Labels seen per attribute; absent values are not labels.
    pub attributes: BTreeMap<String, BTreeSet<String>>,
}

impl DocumentStore {
    /// Load a corpus directory, or a JSONL file otherwise.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let documents = if path.is_dir() {
            load_corpus_dir(path)?
        } else {
            read_documents_from_path(path)?
        };
        let store = Self::from_documents(path, documents)?;
        tracing::info!(
            source = %path.display(),
            documents = store.len(),
            "loaded corpus"
        );
        Ok(store)
    }

    pub fn from_documents(
        source: impl Into<PathBuf>,
        documents: Vec<Document>,
    ) -> Result<Self, StoreError> {
        let mut ids = BTreeSet::new();
        for document in &documents {
            if !ids.insert(document.id.as_str()) {
                return Err(StoreError::Layout(format!(
                    "duplicate document `{}`",
                    document.id
                )));
            }
            let mut names = BTreeSet::new();
            for name in document.annotator_names() {
                if !names.insert(name) {
                    return Err(StoreError::Layout(format!(
                        "document `{}`: duplicate annotator `{name}`",
                        document.id
                    )));
                }
            }
        }
        Ok(Self {
            source: source.into(),
            documents,
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn into_documents(self) -> Vec<Document> {
        self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn summary(&self) -> CorpusSummary {
        let mut annotators: Vec<AnnotatorSummary> = Vec::new();
        let mut attributes: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

        for document in &self.documents {
            for entry in &document.annotators {
                let slot = match annotators.iter().position(|a| a.name == entry.name) {
                    Some(i) => i,
                    None => {
                        annotators.push(AnnotatorSummary {
                            name: entry.name.clone(),
                            documents: 0,
                            mentions: 0,
                        });
                        annotators.len() - 1
                    }
                };
                annotators[slot].documents += 1;
                annotators[slot].mentions += entry.mentions.len();

                for (name, value) in entry.mentions.iter().flat_map(|m| &m.attributes) {
                    let labels = attributes.entry(name.clone()).or_default();
                    if let Some(label) = value.as_label() {
                        labels.insert(label.to_string());
                    }
                }
            }
        }

        CorpusSummary {
            source: self.source.display().to_string(),
            documents: self.documents.len(),
            mentions: self.documents.iter().map(Document::mention_count).sum(),
            annotators,
            attributes,
        }
    }
}

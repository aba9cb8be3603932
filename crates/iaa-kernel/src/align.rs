//! Row alignment: per-document match sets folded into one corpus table.
//!
//! With two participants every match becomes a row. With more, alignment is
//! **reference-anchored**: each non-reference annotator is matched against
//! the reference independently, and mentions that found no reference partner
//! get rows of their own. This is an approximation of a multi-way
//! assignment; two non-reference mentions of the same event are never joined
//! unless the reference also marked it.

use crate::config::{RunConfig, Selection};
use crate::document::{Document, DocumentId};
use crate::error::{Diagnostic, IaaError};
use crate::matcher::{MatchOptions, match_mentions, span_order, validate_mentions};
use crate::mention::{Mention, Span};
use crate::schema::AttributeSchema;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One annotator's slot in an aligned row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cell {
    Mention(Mention),
    /// The annotator has data for the document but marked nothing here.
    NoMention,
    /// The annotator has no data for the document at all.
    NotAnnotated,
}

impl Cell {
    pub fn mention(&self) -> Option<&Mention> {
        match self {
            Self::Mention(m) => Some(m),
            _ => None,
        }
    }

    pub fn participates(&self) -> bool {
        !matches!(self, Self::NotAnnotated)
    }
}

/// One event slot across all column annotators of one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedRow {
    pub document: DocumentId,
    pub cells: Vec<Cell>,
}

impl AlignedRow {
    pub fn mention_count(&self) -> usize {
        self.cells.iter().filter(|c| c.mention().is_some()).count()
    }
}

/// Column annotators plus rows in input document order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignedTable {
    pub annotators: Vec<String>,
    pub rows: Vec<AlignedRow>,
}

impl AlignedTable {
    pub fn column(&self, annotator: &str) -> Option<usize> {
        self.annotators.iter().position(|a| a == annotator)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows_of<'a>(
        &'a self,
        document: &'a DocumentId,
    ) -> impl Iterator<Item = &'a AlignedRow> {
        self.rows.iter().filter(move |r| &r.document == document)
    }

    /// Hex SHA-256 over the canonical JSON form of the table.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        // Every map in a table is keyed by `String`, so serialization is total.
        serde_json::to_writer(&mut hasher, self).expect("aligned table serializes to json");
        format!("{:x}", hasher.finalize())
    }
}

/// The corpus table plus what happened to each document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CorpusAlignment {
    pub table: AlignedTable,
    /// Documents that contributed rows, in input order.
    pub documents: Vec<DocumentId>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds aligned rows for a fixed set of column annotators.
#[derive(Debug, Clone)]
pub struct Aligner {
    columns: Vec<String>,
    reference: Option<String>,
    matching: MatchOptions,
    schema: AttributeSchema,
}

impl Aligner {
    pub fn new(columns: Vec<String>, matching: MatchOptions) -> Self {
        Self {
            columns,
            reference: None,
            matching,
            schema: AttributeSchema::default(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_schema(mut self, schema: AttributeSchema) -> Self {
        self.schema = schema;
        self
    }

    /// Columns follow `annotator_subset`; with `all`, first appearance in
    /// the corpus.
    pub fn from_config(config: &RunConfig, documents: &[Document]) -> Self {
        let columns = match &config.annotator_subset {
            Selection::Only(names) => names.iter().cloned().collect(),
            Selection::All => {
                let mut seen: Vec<String> = Vec::new();
                for name in documents.iter().flat_map(Document::annotator_names) {
                    if !seen.iter().any(|s| s == name) {
                        seen.push(name.to_string());
                    }
                }
                seen
            }
        };

        let mut aligner =
            Self::new(columns, config.match_options()).with_schema(config.schema.clone());
        if let Some(reference) = &config.reference_annotator {
            if !aligner.columns.contains(reference) {
                tracing::warn!(reference = %reference, "reference annotator not found in corpus");
            }
            aligner.reference = Some(reference.clone());
        }
        aligner
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows for one document, ordered by the span of their anchor mention.
    pub fn align_document(&self, document: &Document) -> Result<Vec<AlignedRow>, IaaError> {
        let participants: Vec<(usize, &[Mention])> = self
            .columns
            .iter()
            .enumerate()
            .filter_map(|(col, name)| document.mentions_of(name).map(|m| (col, m)))
            .collect();
        // Annotators outside the columns never reach the schema.
        self.schema
            .check_lists(participants.iter().map(|(_, mentions)| *mentions))?;
        if participants.len() < 2 {
            return Err(IaaError::InsufficientAnnotators {
                document: document.id.to_string(),
                found: participants.len(),
            });
        }
        for (_, mentions) in &participants {
            validate_mentions(mentions)?;
        }

        let reference_pos = self
            .reference
            .as_deref()
            .and_then(|r| participants.iter().position(|(col, _)| self.columns[*col] == r))
            .unwrap_or(0);
        let (reference_col, reference) = participants[reference_pos];

        let blank: Vec<Cell> = (0..self.columns.len())
            .map(|col| {
                if participants.iter().any(|(c, _)| *c == col) {
                    Cell::NoMention
                } else {
                    Cell::NotAnnotated
                }
            })
            .collect();

        // (anchor span, anchor column, cells); reference rows anchor first.
        let mut keyed: Vec<(Span, usize, Vec<Cell>)> = span_order(reference)
            .into_iter()
            .map(|i| {
                let mut cells = blank.clone();
                cells[reference_col] = Cell::Mention(reference[i].clone());
                (reference[i].span, 0, cells)
            })
            .collect();
        let reference_rank: Vec<usize> = {
            let mut rank = vec![0; reference.len()];
            for (row, i) in span_order(reference).into_iter().enumerate() {
                rank[i] = row;
            }
            rank
        };

        for (pos, &(col, mentions)) in participants.iter().enumerate() {
            if pos == reference_pos {
                continue;
            }
            let set = match_mentions(reference, mentions, &self.matching)?;
            for m in set.iter() {
                match (m.left(), m.right()) {
                    (Some(r), Some(o)) => {
                        keyed[reference_rank[r]].2[col] = Cell::Mention(mentions[o].clone());
                    }
                    (None, Some(o)) => {
                        let mut cells = blank.clone();
                        cells[col] = Cell::Mention(mentions[o].clone());
                        keyed.push((mentions[o].span, col + 1, cells));
                    }
                    _ => {}
                }
            }
        }

        keyed.sort_by_key(|(span, rank, _)| (*span, *rank));
        let rows: Vec<AlignedRow> = keyed
            .into_iter()
            .map(|(_, _, cells)| AlignedRow {
                document: document.id.clone(),
                cells,
            })
            .collect();

        tracing::debug!(
            document = %document.id,
            participants = participants.len(),
            reference = %self.columns[reference_col],
            rows = rows.len(),
            "aligned document"
        );
        Ok(rows)
    }

    /// Align every document, then append rows in input order.
    ///
    /// A failing document contributes no rows and one diagnostic.
    pub fn align_corpus(&self, documents: &[Document]) -> CorpusAlignment {
        let outcomes: Vec<(&DocumentId, Result<Vec<AlignedRow>, IaaError>)> = documents
            .iter()
            .map(|d| (&d.id, self.align_document(d)))
            .collect();

        let mut alignment = CorpusAlignment {
            table: AlignedTable {
                annotators: self.columns.clone(),
                rows: Vec::new(),
            },
            ..CorpusAlignment::default()
        };
        for (id, outcome) in outcomes {
            match outcome {
                Ok(rows) => {
                    alignment.documents.push(id.clone());
                    alignment.table.rows.extend(rows);
                }
                Err(error) => {
                    tracing::warn!(document = %id, %error, "skipping document");
                    alignment.diagnostics.push(Diagnostic::for_document(id, &error));
                }
            }
        }
        alignment
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;

    fn m(id: &str, start: i64, end: i64, label: &str) -> Mention {
        Mention::new(id, start, end).with_attribute("type", label)
    }

    fn ids(row: &AlignedRow) -> Vec<&str> {
        row.cells
            .iter()
            .map(|c| match c {
                Cell::Mention(m) => m.source_id.as_str(),
                Cell::NoMention => "-",
                Cell::NotAnnotated => "x",
            })
            .collect()
    }

    fn pair_doc() -> Document {
        Document::new("d1")
            .with_annotator("a", vec![m("a1", 0, 5, "attack"), m("a2", 10, 15, "attack")])
            .with_annotator("b", vec![m("b1", 0, 4, "attack"), m("b2", 20, 25, "attack")])
    }

    #[test]
    fn two_annotators_fallback_gives_three_rows() {
        let aligner = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::with_fallback(0.5));
        let rows = aligner.align_document(&pair_doc()).unwrap();
        let shape: Vec<Vec<&str>> = rows.iter().map(ids).collect();
        assert_eq!(shape, [vec!["a1", "b1"], vec!["a2", "-"], vec!["-", "b2"]]);
    }

    #[test]
    fn exact_only_splits_near_misses() {
        let aligner = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::exact_only());
        let rows = aligner.align_document(&pair_doc()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(ids(&rows[0]), ["-", "b1"]);
        assert_eq!(ids(&rows[1]), ["a1", "-"]);
    }

    #[test]
    fn reference_anchors_three_way_rows() {
        let doc = Document::new("d1")
            .with_annotator("a", vec![m("a1", 0, 5, "attack"), m("a2", 30, 35, "kill")])
            .with_annotator("b", vec![m("b1", 0, 5, "attack"), m("b2", 12, 18, "kill")])
            .with_annotator("c", vec![m("c1", 30, 35, "kill"), m("c2", 12, 18, "kill")]);
        let aligner = Aligner::new(
            vec!["a".into(), "b".into(), "c".into()],
            MatchOptions::exact_only(),
        );
        let rows = aligner.align_document(&doc).unwrap();
        let shape: Vec<Vec<&str>> = rows.iter().map(ids).collect();
        // b2 and c2 agree with each other but not with the reference.
        assert_eq!(
            shape,
            [
                vec!["a1", "b1", "-"],
                vec!["-", "b2", "-"],
                vec!["-", "-", "c2"],
                vec!["a2", "-", "c1"],
            ]
        );

        let anchored_on_b = aligner.clone().with_reference("b");
        let rows = anchored_on_b.align_document(&doc).unwrap();
        let shape: Vec<Vec<&str>> = rows.iter().map(ids).collect();
        assert_eq!(
            shape,
            [
                vec!["a1", "b1", "-"],
                vec!["-", "b2", "c2"],
                vec!["a2", "-", "-"],
                vec!["-", "-", "c1"],
            ]
        );
    }

    #[test]
    fn every_mention_lands_in_exactly_one_row() {
        let doc = Document::new("d1")
            .with_annotator(
                "a",
                vec![m("a1", 0, 5, "x"), m("a2", 3, 9, "x"), m("a3", 40, 44, "y")],
            )
            .with_annotator("b", vec![m("b1", 1, 5, "x"), m("b2", 50, 52, "y")])
            .with_annotator(
                "c",
                vec![m("c1", 0, 5, "x"), m("c2", 3, 8, "y"), m("c3", 60, 61, "y")],
            );
        let aligner = Aligner::new(
            vec!["a".into(), "b".into(), "c".into()],
            MatchOptions::with_fallback(0.3),
        );
        let rows = aligner.align_document(&doc).unwrap();

        let mut seen: Vec<&str> = rows
            .iter()
            .flat_map(|r| r.cells.iter().filter_map(Cell::mention))
            .map(|m| m.source_id.as_str())
            .collect();
        seen.sort_unstable();
        assert_eq!(seen, ["a1", "a2", "a3", "b1", "b2", "c1", "c2", "c3"]);
        assert!(rows.iter().all(|r| r.mention_count() >= 1));
    }

    #[test]
    fn absent_annotator_is_not_annotated() {
        let doc = Document::new("d1")
            .with_annotator("a", vec![m("a1", 0, 5, "attack")])
            .with_annotator("c", vec![m("c1", 0, 5, "attack")]);
        let aligner = Aligner::new(
            vec!["a".into(), "b".into(), "c".into()],
            MatchOptions::exact_only(),
        );
        let rows = aligner.align_document(&doc).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(ids(&rows[0]), ["a1", "x", "c1"]);
        assert!(!rows[0].cells[1].participates());
    }

    #[test]
    fn single_participant_is_insufficient() {
        let doc = Document::new("lonely").with_annotator("a", vec![m("a1", 0, 5, "attack")]);
        let aligner = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::exact_only());
        assert_eq!(
            aligner.align_document(&doc).unwrap_err(),
            IaaError::InsufficientAnnotators {
                document: "lonely".into(),
                found: 1
            }
        );
    }

    #[test]
    fn failed_documents_leave_no_rows() {
        let bad = Document::new("bad")
            .with_annotator("a", vec![m("a1", 0, 5, "attack")])
            .with_annotator("b", vec![m("b1", 7, 2, "attack")]);
        let docs = vec![pair_doc(), bad, Document::new("empty").with_annotator("a", vec![])];
        let aligner = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::with_fallback(0.5));
        let alignment = aligner.align_corpus(&docs);

        assert_eq!(alignment.documents, [DocumentId::new("d1")]);
        assert_eq!(alignment.table.len(), 3);
        assert!(alignment.table.rows.iter().all(|r| r.document.as_str() == "d1"));
        let kinds: Vec<DiagnosticKind> = alignment.diagnostics.iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            [DiagnosticKind::MalformedMention, DiagnosticKind::InsufficientAnnotators]
        );
    }

    #[test]
    fn schema_violation_skips_document() {
        let aligner = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::exact_only())
            .with_schema(AttributeSchema::default().with_attribute("type", ["kill"]));
        let err = aligner.align_document(&pair_doc()).unwrap_err();
        assert!(matches!(err, IaaError::InvalidLabel { .. }));
    }

    #[test]
    fn schema_ignores_annotators_outside_columns() {
        let doc = pair_doc().with_annotator("c", vec![m("c1", 0, 5, "meet")]);
        let schema = AttributeSchema::default().with_attribute("type", ["attack", "kill"]);

        let restricted = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::exact_only())
            .with_schema(schema.clone());
        assert_eq!(restricted.align_document(&doc).unwrap().len(), 4);

        let everyone = Aligner::new(
            vec!["a".into(), "b".into(), "c".into()],
            MatchOptions::exact_only(),
        )
        .with_schema(schema);
        let err = everyone.align_document(&doc).unwrap_err();
        assert!(matches!(err, IaaError::InvalidLabel { ref source_id, .. } if source_id == "c1"));
    }

    #[test]
    fn columns_follow_first_appearance() {
        let docs = vec![
            Document::new("d1").with_annotator("zed", vec![]).with_annotator("amy", vec![]),
            Document::new("d2").with_annotator("bob", vec![]).with_annotator("amy", vec![]),
        ];
        let aligner = Aligner::from_config(&RunConfig::default(), &docs);
        assert_eq!(aligner.columns(), ["zed", "amy", "bob"]);
    }

    #[test]
    fn digest_is_stable() {
        let aligner = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::with_fallback(0.5));
        let first = aligner.align_corpus(&[pair_doc()]).table;
        let second = aligner.align_corpus(&[pair_doc()]).table;
        assert_eq!(first.digest(), second.digest());
        assert_eq!(first.digest().len(), 64);
        let bytes = serde_json::to_vec(&first).unwrap();
        assert_eq!(first.digest(), format!("{:x}", Sha256::digest(&bytes)));

        let exact = Aligner::new(vec!["a".into(), "b".into()], MatchOptions::exact_only())
            .align_corpus(&[pair_doc()])
            .table;
        assert_ne!(first.digest(), exact.digest());
    }
}

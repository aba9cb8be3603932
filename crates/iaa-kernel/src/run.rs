//! Run orchestration: configuration and documents in, one report out.

use crate::agreement::{AgreementCalculator, AgreementResult, Scope};
use crate::align::{AlignedTable, Aligner, Cell, CorpusAlignment};
use crate::config::{Metric, RunConfig, Selection};
use crate::detection::{DetectionSummary, detection_summary};
use crate::document::{Document, DocumentId};
use crate::error::{Diagnostic, IaaError};
use crate::schema::AttributeSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Everything one run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StudyReport {
    pub config: RunConfig,
    pub annotators: Vec<String>,
    pub attributes: Vec<String>,
    /// Documents that contributed rows.
    pub documents: Vec<DocumentId>,
    pub table_digest: String,
    pub results: Vec<AgreementResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detection: Option<DetectionSummary>,
    pub diagnostics: Vec<Diagnostic>,
    pub table: AlignedTable,
}

impl StudyReport {
    pub fn result(
        &self,
        attribute: &str,
        metric: Metric,
        scope: &Scope,
    ) -> Option<&AgreementResult> {
        self.results
            .iter()
            .find(|r| r.attribute == attribute && r.metric == metric && &r.scope == scope)
    }

    /// Scalar value of one entry, if present and computable.
    pub fn scalar(&self, attribute: &str, metric: Metric, scope: &Scope) -> Option<f64> {
        self.result(attribute, metric, scope)
            .and_then(|r| r.outcome.as_f64())
    }
}

/// Align `documents` under `config`.
///
/// Fails with `EmptyCorpus` when no document yields rows.
pub fn align_corpus(
    documents: &[Document],
    config: &RunConfig,
) -> Result<CorpusAlignment, IaaError> {
    config.validate()?;
    if documents.is_empty() {
        return Err(IaaError::EmptyCorpus);
    }
    let aligner = Aligner::from_config(config, documents);
    let alignment = aligner.align_corpus(documents);
    if alignment.documents.is_empty() {
        return Err(IaaError::EmptyCorpus);
    }
    Ok(alignment)
}

/// Attribute names to score, in sorted order.
///
/// With `all`: every attribute on a mention in the table, plus every
/// attribute the schema names.
pub fn resolve_attributes(
    table: &AlignedTable,
    selection: &Selection,
    schema: &AttributeSchema,
) -> Vec<String> {
    match selection {
        Selection::Only(names) => names.iter().cloned().collect(),
        Selection::All => {
            let mut names: BTreeSet<&str> = schema.attribute_names().collect();
            names.extend(
                table
                    .rows
                    .iter()
                    .flat_map(|row| row.cells.iter().filter_map(Cell::mention))
                    .flat_map(|m| m.attributes.keys().map(String::as_str)),
            );
            names.into_iter().map(str::to_string).collect()
        }
    }
}

/// Run a full agreement study.
///
/// Skipped documents and aborted attributes end up in
/// [`StudyReport::diagnostics`]; only an empty corpus or an invalid
/// configuration fail the run.
pub fn run_study(documents: &[Document], config: &RunConfig) -> Result<StudyReport, IaaError> {
    let CorpusAlignment {
        table,
        documents: aligned,
        mut diagnostics,
    } = align_corpus(documents, config)?;

    let attributes = resolve_attributes(&table, &config.attribute_subset, &config.schema);
    let calculator = AgreementCalculator::new(&table, config.unmatched_policy)
        .strict(config.require_complete_attributes);

    let mut results = Vec::new();
    for attribute in &attributes {
        match calculator.compute(attribute, &config.metrics, config.macro_average) {
            Ok(mut computed) => results.append(&mut computed),
            Err(error) => {
                tracing::warn!(attribute = %attribute, %error, "skipping attribute");
                diagnostics.push(Diagnostic::for_attribute(attribute, &error));
            }
        }
    }

    let detection = config
        .wants(Metric::Detection)
        .then(|| detection_summary(&table));

    tracing::info!(
        documents = aligned.len(),
        skipped = diagnostics.len(),
        rows = table.len(),
        attributes = attributes.len(),
        results = results.len(),
        "study complete"
    );

    Ok(StudyReport {
        config: config.clone(),
        annotators: table.annotators.clone(),
        attributes,
        documents: aligned,
        table_digest: table.digest(),
        results,
        detection,
        diagnostics,
        table,
    })
}

//! # IAA Kernel
//!
//! Inter-annotator agreement over event-annotated documents: decide which
//! mentions from independent annotators denote the same event, then measure
//! how consistently the annotators labelled them.
//!
//! This crate is **schema-agnostic**: attribute names and label sets are
//! runtime data. It performs no I/O; loading and reporting live in the
//! store and CLI crates.
//!
//! ## Architecture
//!
//! ```text
//! Document              ← Per-annotator mention lists over one text
//!     │
//! match_mentions        ← Exact-then-overlap pairing of two lists
//!     │
//! Aligner               ← Reference-anchored rows, concatenated per corpus
//!     │
//! AgreementCalculator   ← Observed, kappa, alpha, confusion tables
//!     │
//! run_study             ← Config in, StudyReport out
//! ```

pub mod agreement;
pub mod align;
pub mod config;
pub mod detection;
pub mod document;
pub mod error;
pub mod matcher;
pub mod mention;
pub mod run;
pub mod schema;

pub use agreement::{
    AgreementCalculator, AgreementResult, ConfusionTable, Outcome, Rating, RatingGrid, Scope,
    Score,
};
pub use align::{AlignedRow, AlignedTable, Aligner, Cell, CorpusAlignment};
pub use config::{
    MatchingMode, Metric, OverlapMeasure, RunConfig, Selection, UnmatchedPolicy,
};
pub use detection::{DetectionScores, DetectionSummary, detection_summary};
pub use document::{AnnotatorMentions, Document, DocumentId};
pub use error::{Diagnostic, DiagnosticKind, IaaError};
pub use matcher::{Match, MatchOptions, MatchSet, match_mentions, overlap_score};
pub use mention::{AttributeValue, Mention, Span};
pub use run::{StudyReport, align_corpus, resolve_attributes, run_study};
pub use schema::AttributeSchema;

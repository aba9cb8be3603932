//! # iaa-store
//!
//! Loading and persistence for agreement studies.
//!
//! This crate provides:
//! - JSONL corpus read/write (one document per line)
//! - Directory corpora (`<root>/<document>/<annotator>.json`)
//! - TOML run configuration and attribute schema files
//! - `DocumentStore`, a validated, deterministically ordered corpus
//!
//! All computation lives in `iaa-kernel`; this crate only moves data
//! across the filesystem boundary.

pub mod config_file;
pub mod error;
pub mod jsonl;
pub mod layout;
pub mod store;

pub use config_file::{load_run_config, load_schema};
pub use error::StoreError;
pub use jsonl::{
    read_documents, read_documents_from_path, write_jsonl_to_path, write_lines, write_rows,
};
pub use layout::load_corpus_dir;
pub use store::{AnnotatorSummary, CorpusSummary, DocumentStore};

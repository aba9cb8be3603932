use crate::cli::RunArgs;
use iaa_kernel::{MatchingMode, Outcome, RunConfig, Selection, UnmatchedPolicy};
use iaa_store::{DocumentStore, load_run_config, load_schema};
use serde::Serialize;
use std::path::Path;

pub fn fail(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
}

pub fn load_store_or_exit(corpus: &Path) -> DocumentStore {
    DocumentStore::load(corpus)
        .unwrap_or_else(|e| fail(format!("failed to load {}: {e}", corpus.display())))
}

/// Config file (or defaults), then schema file, then flag overrides.
pub fn build_config_or_exit(args: &RunArgs) -> RunConfig {
    let mut config = match &args.config {
        Some(path) => load_run_config(path)
            .unwrap_or_else(|e| fail(format!("failed to load {}: {e}", path.display()))),
        None => RunConfig::default(),
    };

    if let Some(path) = &args.schema {
        config.schema = load_schema(path)
            .unwrap_or_else(|e| fail(format!("failed to load {}: {e}", path.display())));
    }
    if args.fallback {
        config.matching_mode = MatchingMode::Fallback;
    }
    if let Some(threshold) = args.threshold {
        config.min_overlap_threshold = threshold;
    }
    if let Some(measure) = args.measure {
        config.overlap_measure = measure;
    }
    if args.head_threshold.is_some() {
        config.head_threshold = args.head_threshold;
    }
    if !args.restricted.is_empty() {
        config.annotator_subset = Selection::only(args.restricted.iter().cloned());
    }
    if let Some(reference) = &args.reference {
        config.reference_annotator = Some(reference.clone());
    }
    if !args.attributes.is_empty() {
        config.attribute_subset = Selection::only(args.attributes.iter().cloned());
    }
    if !args.metrics.is_empty() {
        config.metrics = args.metrics.iter().copied().collect();
    }
    if args.exclude_unmatched {
        config.unmatched_policy = UnmatchedPolicy::ExcludeFromDenominator;
    }
    if args.strict_attributes {
        config.require_complete_attributes = true;
    }
    if args.cross_sentence {
        config.same_sentence_only = false;
    }

    config.validate().unwrap_or_else(|e| fail(e));
    config
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization")
    );
}

pub fn render_outcome(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Scalar { value } => format!("{value:.4}"),
        Outcome::ConfusionTable { table } => format!("{} items", table.total()),
        Outcome::NotComputable { reason } => format!("n/a ({reason})"),
    }
}

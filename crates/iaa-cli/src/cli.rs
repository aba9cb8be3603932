use clap::{ArgAction, Args, Parser, Subcommand};
use iaa_kernel::{Metric, OverlapMeasure};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "iaa",
    about = "Inter-annotator agreement for event mention annotations",
    version
)]
pub struct Cli {
    /// Raise log verbosity (-v info, -vv debug); RUST_LOG overrides
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Match, align and score a corpus
    Study {
        /// Corpus directory or JSONL file
        corpus: PathBuf,

        #[command(flatten)]
        run: RunArgs,

        /// Also write the aligned rows as JSONL to this path
        #[arg(long)]
        rows_out: Option<PathBuf>,

        /// Output the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print aligned rows as JSONL
    Align {
        /// Corpus directory or JSONL file
        corpus: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Summarize documents, annotators and attributes of a corpus
    Inspect {
        /// Corpus directory or JSONL file
        corpus: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Run options. Flags override values from `--config`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Run configuration (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Attribute schema (TOML, `[attributes] name = [labels]`)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Pair leftover mentions by span overlap after exact matching
    #[arg(long)]
    pub fallback: bool,

    /// Minimum overlap ratio for a fallback pair, in (0, 1]
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Overlap ratio: jaccard or dice
    #[arg(long)]
    pub measure: Option<OverlapMeasure>,

    /// Pair overlapping mentions by head-set Dice first, at this threshold
    #[arg(long)]
    pub head_threshold: Option<f64>,

    /// Only compare these annotators (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub restricted: Vec<String>,

    /// Anchor annotator for three or more annotators
    #[arg(long)]
    pub reference: Option<String>,

    /// Attribute to score (repeatable; default all)
    #[arg(long = "attribute")]
    pub attributes: Vec<String>,

    /// Metric to compute (repeatable)
    #[arg(long = "metric")]
    pub metrics: Vec<Metric>,

    /// Drop rows with a missing mention from the denominator
    #[arg(long)]
    pub exclude_unmatched: bool,

    /// Fail an attribute when a mention lacks it
    #[arg(long)]
    pub strict_attributes: bool,

    /// Allow fallback pairs across sentence boundaries
    #[arg(long)]
    pub cross_sentence: bool,
}

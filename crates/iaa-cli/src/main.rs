//! IAA CLI: the `iaa` command.

mod cli;
mod commands;
mod logging;
mod support;

use clap::Parser;
use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Commands::Study {
            corpus,
            run,
            rows_out,
            json,
        } => commands::study::run(corpus, run, rows_out, json),

        Commands::Align { corpus, run } => commands::align::run(corpus, run),

        Commands::Inspect { corpus, json } => commands::inspect::run(corpus, json),
    }
}

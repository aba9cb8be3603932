use crate::cli::RunArgs;
use crate::support::{build_config_or_exit, fail, load_store_or_exit, print_json, render_outcome};
use iaa_kernel::{ConfusionTable, Outcome, Score, StudyReport, run_study};
use iaa_store::write_jsonl_to_path;
use std::path::PathBuf;

pub fn run(corpus: PathBuf, args: RunArgs, rows_out: Option<PathBuf>, json_output: bool) {
    let config = build_config_or_exit(&args);
    let store = load_store_or_exit(&corpus);
    let report = run_study(store.documents(), &config).unwrap_or_else(|e| fail(e));

    if let Some(path) = &rows_out {
        write_jsonl_to_path(path, &report.table.rows)
            .unwrap_or_else(|e| fail(format!("failed to write {}: {e}", path.display())));
    }

    if json_output {
        print_json(&report);
    } else {
        print_report(&corpus, &report, rows_out.as_ref());
    }
}

fn print_report(corpus: &std::path::Path, report: &StudyReport, rows_out: Option<&PathBuf>) {
    println!("iaa study {}", corpus.display());
    let config = &report.config;
    println!(
        "  Matching: {} (threshold {}, {})",
        config.matching_mode, config.min_overlap_threshold, config.overlap_measure
    );
    if let Some(threshold) = config.head_threshold {
        println!("  Head threshold: {threshold}");
    }
    println!("  Annotators: {}", report.annotators.join(", "));
    println!("  Documents: {}", report.documents.len());
    println!("  Aligned rows: {}", report.table.len());
    println!("  Table digest: {}", report.table_digest);
    if let Some(path) = rows_out {
        println!("  Rows written: {}", path.display());
    }

    for attribute in &report.attributes {
        let entries: Vec<_> = report
            .results
            .iter()
            .filter(|r| &r.attribute == attribute)
            .collect();
        if entries.is_empty() {
            continue;
        }
        println!();
        println!("  Attribute {attribute}:");
        for entry in entries {
            println!(
                "    {:<20} {:<16} {}",
                entry.metric.name(),
                entry.scope.to_string(),
                render_outcome(&entry.outcome)
            );
            if let Outcome::ConfusionTable { table } = &entry.outcome {
                print_confusion(table);
            }
        }
    }

    if let Some(detection) = &report.detection {
        println!();
        println!("  Detection:");
        for pair in &detection.pairs {
            println!(
                "    {} ~ {}: matched {}, {}-only {}, {}-only {}, P {} R {} F1 {}",
                pair.left,
                pair.right,
                pair.matched,
                pair.left,
                pair.left_only,
                pair.right,
                pair.right_only,
                render_score(&pair.precision),
                render_score(&pair.recall),
                render_score(&pair.f1)
            );
        }
        println!(
            "    macro: P {} R {} F1 {}",
            render_score(&detection.macro_precision),
            render_score(&detection.macro_recall),
            render_score(&detection.macro_f1)
        );
    }

    if !report.diagnostics.is_empty() {
        println!();
        println!("  Diagnostics ({}):", report.diagnostics.len());
        for diagnostic in &report.diagnostics {
            println!("    - [{}] {}", diagnostic.kind, diagnostic.message);
        }
    }
}

fn render_score(score: &Score) -> String {
    render_outcome(&score.clone().into())
}

fn print_confusion(table: &ConfusionTable) {
    let names: Vec<String> = table.labels.iter().map(ToString::to_string).collect();
    let width = names.iter().map(String::len).max().unwrap_or(0).max(6);
    print!("      {:<width$}", "");
    for name in &names {
        print!(" {name:>width$}");
    }
    println!();
    for (name, row) in names.iter().zip(&table.counts) {
        print!("      {name:<width$}");
        for count in row {
            print!(" {count:>width$}");
        }
        println!();
    }
}

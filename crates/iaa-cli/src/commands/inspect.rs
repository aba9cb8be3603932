use crate::support::{load_store_or_exit, print_json};
use std::path::PathBuf;

pub fn run(corpus: PathBuf, json_output: bool) {
    let store = load_store_or_exit(&corpus);
    let summary = store.summary();

    if json_output {
        print_json(&summary);
        return;
    }

    println!("iaa inspect {}", summary.source);
    println!("  Documents: {}", summary.documents);
    println!("  Mentions: {}", summary.mentions);
    println!("  Annotators:");
    for annotator in &summary.annotators {
        println!(
            "    {} ({} documents, {} mentions)",
            annotator.name, annotator.documents, annotator.mentions
        );
    }
    println!("  Attributes:");
    if summary.attributes.is_empty() {
        println!("    (none)");
    }
    for (name, labels) in &summary.attributes {
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
        println!("    {name}: {}", labels.join(", "));
    }
}

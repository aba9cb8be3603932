use crate::cli::RunArgs;
use crate::support::{build_config_or_exit, fail, load_store_or_exit};
use iaa_kernel::align_corpus;
use iaa_store::write_rows;
use std::io::Write;
use std::path::PathBuf;

pub fn run(corpus: PathBuf, args: RunArgs) {
    let config = build_config_or_exit(&args);
    let store = load_store_or_exit(&corpus);
    let alignment = align_corpus(store.documents(), &config).unwrap_or_else(|e| fail(e));

    for diagnostic in &alignment.diagnostics {
        eprintln!("skipped: {}", diagnostic.message);
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_rows(&mut out, &alignment.table.rows).unwrap_or_else(|e| fail(e));
    out.flush().unwrap_or_else(|e| fail(e));
}

//! stderr logging for the CLI.

use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins; otherwise `-v` selects info and `-vv` debug for the iaa crates.
pub fn init(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "warn,iaa_kernel=info,iaa_store=info,iaa_cli=info",
        _ => "info,iaa_kernel=debug,iaa_store=debug,iaa_cli=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

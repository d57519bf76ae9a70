//! Tracing setup for the CLI.
//!
//! By default only warnings are shown; `--verbose` raises the crate's level
//! to debug. `RUST_LOG` overrides both.

use tracing_subscriber::EnvFilter;

/// Initialize the logging system.
///
/// Safe to call once per process; later calls are ignored (relevant for
/// tests running in one process).
pub fn init(verbose: bool) {
    let default = if verbose {
        "quick_transfer=debug"
    } else {
        "quick_transfer=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init();
}

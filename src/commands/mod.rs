//! CLI subcommand implementations.

pub mod ask;
pub mod auth;
pub mod config;
pub mod models;

use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber. `--quiet` keeps only fatal noise,
/// `--verbose` enables debug logs, otherwise `RUST_LOG` or `warn` applies.
pub(crate) fn init_logging(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("promptfan=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .try_init();
}

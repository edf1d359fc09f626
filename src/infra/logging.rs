//! Diagnostic logging setup.
//!
//! User-facing progress goes to stdout through `println!`; `tracing` events
//! are diagnostics and go to stderr, filtered by `RUST_LOG`.

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber. `RUST_LOG` wins over `verbose`.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logging(verbose: bool) {
    let default_level = if verbose { "grid_runner=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

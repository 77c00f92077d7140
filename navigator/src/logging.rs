//! Diagnostic tracing to stderr.
//!
//! Route results (final coordinates, rejections, listings) are printed to
//! stdout by the CLI and are not affected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_FILTER: &str = "navigator=info";

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`; defaults to `navigator=info`. Output: stderr, compact.
///
/// # Example
/// ```bash
/// RUST_LOG=navigator=debug navigator drive
/// ```
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

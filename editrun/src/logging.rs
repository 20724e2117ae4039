//! Diagnostic tracing for the editrun CLI.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Diagnostics via `RUST_LOG`, output to stderr.
//!   Not persisted, not part of the run's product output.
//!
//! - **Run recording (`io/recorder`)**: Product artifacts on stdout and in
//!   the run log directory. Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `warn`, or `info` for this crate when
/// `verbose` is set and `RUST_LOG` is unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=editrun=debug editrun run --plan plan.toml
/// ```
pub fn init(verbose: bool) {
    let default = if verbose { "warn,editrun=info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}

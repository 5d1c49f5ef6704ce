//! Tracing setup for binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install a stderr subscriber. Defaults to `info`; override with the
/// standard `RUST_LOG` variable. Safe to call more than once — later calls
/// are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

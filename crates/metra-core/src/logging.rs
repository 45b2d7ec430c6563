//! Tracing initialization for host binaries and tests.

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber, filtered by `METRA_LOG`
/// (falling back to `info`). Safe to call more than once; later calls
/// are no-ops.
pub fn init() {
    let filter = EnvFilter::try_from_env("METRA_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

//! Shared startup glue for the relay binaries.

use tracing_subscriber::EnvFilter;

/// Initialize the diagnostic log on stderr.
///
/// Stdout belongs to the mail pipeline and is never written to; stderr is
/// collected by the mail server's logger. `RUST_LOG` overrides the default
/// `info` level.
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

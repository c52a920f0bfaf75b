use std::sync::Once;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global fmt subscriber. `RUST_LOG` wins over `default_filter`.
///
/// Logs go to stderr so stdout only carries the deployment result.
pub fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Like [`init_logging`], but later calls are ignored. Useful for tests.
pub fn init_logging_reentrant(default_filter: &str) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| init_logging(default_filter));
}

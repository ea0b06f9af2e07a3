//! Structured logging to stderr.
//!
//! Level priority: RUST_LOG env var > --debug flag > --log-level / config `log_level`.
//! Stdout is left for tailed log output. Never logs access tokens.

use tracing_subscriber::EnvFilter;

/// Initialise the tracing subscriber.
///
/// Safe to call more than once; later calls are ignored.
pub fn init(debug_flag: bool, config_level: &str) {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if debug_flag {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new(config_level)
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact()
        .try_init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "Logging initialised");
}

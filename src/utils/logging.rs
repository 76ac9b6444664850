// src/utils/logging.rs
use tracing_subscriber::{fmt, EnvFilter};

// HTTP internals are noisy at debug level.
const QUIET_DEPENDENCIES: &str = "hyper=warn,hyper_util=warn,reqwest=warn";

/// Installs the global tracing subscriber.
/// `RUST_LOG` wins when set; otherwise `level` applies to this crate's own events.
pub fn setup_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)));

    fmt().with_env_filter(filter).with_target(false).init();

    tracing::debug!("Logging setup complete.");
}

fn default_directives(level: &str) -> String {
    format!("{},{}", level, QUIET_DEPENDENCIES)
}

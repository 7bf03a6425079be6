//! Tracing setup.
//!
//! Components log through the `tracing` macros with a `component` field
//! (`component = "table"`, `component = "api"`, ...). The subscriber is
//! installed once per process; the level comes from the config and
//! `RUST_LOG` wins over it when set.

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ClientConfig;

/// Install the global subscriber. Calling it again is a no-op.
pub fn init_tracing(config: &ClientConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(&config.log_level)));

    // A second install fails harmlessly (tests, embedding UIs).
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Level for this workspace's crates; dependencies stay at `warn`.
fn filter_directive(level: &str) -> String {
    format!(
        "warn,tesoreria_frontend={level},shared={level}",
        level = level.trim().to_lowercase()
    )
}

//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise the configured directive is used.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::error::ConfigError;

/// Install the global subscriber. Call once, early in `main`.
pub fn init_logging(default_filter: &str) -> Result<(), ConfigError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .map_err(|e| ConfigError::Invalid(format!("log filter '{}': {}", default_filter, e)))?,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .try_init()
        .map_err(|e| ConfigError::Invalid(format!("logging already initialised: {}", e)))
}

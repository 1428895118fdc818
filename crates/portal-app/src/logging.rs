//! Tracing subscriber setup

use crate::config::LoggingConfig;
use crate::error::{AppError, Result};
use tracing_subscriber::EnvFilter;

/// Environment variable overriding the configured filter
pub const LOG_ENV: &str = "PORTAL_LOG";

/// Filter from `PORTAL_LOG` when set, else from the config
///
/// # Errors
/// `AppError::Logging` when the configured directives do not parse.
pub fn filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_env(LOG_ENV) {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter).map_err(|e| AppError::Logging(e.to_string())),
    }
}

/// Install the global subscriber, writing to stderr
///
/// # Errors
/// `AppError::Logging` for a bad filter or when a subscriber is already set.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter(config)?)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| AppError::Logging(e.to_string()))
}

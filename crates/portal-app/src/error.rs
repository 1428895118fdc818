//! Application error types

use portal_account::AccountError;
use portal_gate::GateError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while assembling or driving the application
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration file could not be read
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        /// File that was requested
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`PortalConfig`](crate::PortalConfig)
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Log filter directive rejected or subscriber already installed
    #[error("logging setup failed: {0}")]
    Logging(String),

    /// Session bootstrap stopped before publishing an account
    #[error("session ended before the account loaded")]
    SessionClosed,

    /// Account layer failure
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Gate failure
    #[error(transparent)]
    Gate(#[from] GateError),
}

/// Result alias for application operations
pub type Result<T> = std::result::Result<T, AppError>;

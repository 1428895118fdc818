//! Portal App - composition root and CLI
//!
//! Loads [`PortalConfig`], installs logging and wires the account and gate
//! crates together over the in-memory backends.

#![warn(unreachable_pub)]

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod simulate;

pub use app::App;
pub use config::{LoggingConfig, PortalConfig};
pub use error::{AppError, Result};
pub use simulate::{SimulationOptions, SimulationReport, Step};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

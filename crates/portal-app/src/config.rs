//! Portal configuration
//!
//! Every section has defaults, so an empty file (or no file at all) gives the
//! standard setup. A `[[plans]]` list replaces the standard catalog.

use crate::error::{AppError, Result};
use portal_access::PlanCatalog;
use portal_account::CacheConfig;
use portal_gate::GateConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default log filter
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, overridden by `PORTAL_LOG`
    pub filter: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            json: false,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalConfig {
    /// Subscription gate timing
    pub gate: GateConfig,
    /// Account snapshot cache
    pub cache: CacheConfig,
    /// Log output
    pub logging: LoggingConfig,
    /// Plan catalog override
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plans: Option<PlanCatalog>,
}

impl PortalConfig {
    /// Parse from a TOML string, missing fields take defaults
    ///
    /// # Errors
    /// `AppError::ConfigParse` for malformed TOML or an invalid plan list.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// `AppError::ConfigRead` if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// With gate configuration
    #[must_use]
    pub fn with_gate(mut self, gate: GateConfig) -> Self {
        self.gate = gate;
        self
    }

    /// With cache configuration
    #[must_use]
    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// With logging configuration
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// With plan catalog
    #[must_use]
    pub fn with_plans(mut self, plans: PlanCatalog) -> Self {
        self.plans = Some(plans);
        self
    }

    /// Catalog in effect
    #[must_use]
    pub fn catalog(&self) -> PlanCatalog {
        self.plans.clone().unwrap_or_default()
    }
}

//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all application settings.
//! Configuration is loaded from a TOML file; every section has defaults, and
//! `BERTH_DATA_DIR` overrides the storage root.
//!
//! # Example
//!
//! ```no_run
//! use berth::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("berth.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::logging::LoggingConfig;
use super::runtime::{BuildConfig, LimitsConfig, RuntimeConfig};
use super::storage::{StorageConfig, DATA_DIR_ENV};
use super::telemetry::TelemetryConfig;
use crate::error::{ConfigError, Result};

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Database and archive locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Container runtime binary, timeouts and resource caps.
    #[serde(default)]
    pub runtime: RuntimeConfig,

    #[serde(default)]
    pub build: BuildConfig,

    /// Stats/log polling cadence.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Per-tenant admission limits.
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    #[allow(clippy::result_large_err)]
    pub fn parse_toml(content: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.storage.data_dir = PathBuf::from(dir);
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    #[allow(clippy::result_large_err)]
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Validate configuration values.
    #[allow(clippy::result_large_err)]
    fn validate(&self) -> Result<()> {
        if self.runtime.binary.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "runtime.binary",
            }
            .into());
        }
        if self.runtime.command_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runtime.command_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.runtime.build_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "runtime.build_timeout_secs",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.runtime.memory_mib < 6 {
            return Err(ConfigError::InvalidValue {
                field: "runtime.memory_mib",
                reason: "must be at least 6 MiB".to_string(),
            }
            .into());
        }
        if !(self.runtime.cpus > 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "runtime.cpus",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.telemetry.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.poll_interval_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.telemetry.poll_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.poll_timeout_ms",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.telemetry.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "telemetry.channel_capacity",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        if self.limits.max_workloads_per_tenant == 0 {
            return Err(ConfigError::InvalidValue {
                field: "limits.max_workloads_per_tenant",
                reason: "must be greater than 0".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

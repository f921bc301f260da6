//! Canonical test configurations.

use std::path::Path;

use crate::infrastructure::config::{Config, StorageConfig, TelemetryConfig};

/// Configuration rooted at `data_dir` with fast telemetry polling.
pub fn rooted_at(data_dir: &Path) -> Config {
    Config {
        storage: StorageConfig::at(data_dir),
        telemetry: TelemetryConfig {
            poll_interval_ms: 20,
            poll_timeout_ms: 200,
            channel_capacity: 4,
        },
        ..Config::default()
    }
}

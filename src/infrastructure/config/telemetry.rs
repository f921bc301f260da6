//! Telemetry polling configuration.

use std::time::Duration;

use serde::Deserialize;

/// Cadence and bounds of stats/log polling.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryConfig {
    /// Interval between polls of a live subscription (default: 2000ms).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Timeout of a single stats/logs poll (default: 5000ms).
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Buffered updates per subscriber before the poller waits.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

const fn default_poll_interval_ms() -> u64 {
    2000
}

const fn default_poll_timeout_ms() -> u64 {
    5000
}

const fn default_channel_capacity() -> usize {
    16
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            poll_timeout_ms: default_poll_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl TelemetryConfig {
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    #[must_use]
    pub const fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }
}

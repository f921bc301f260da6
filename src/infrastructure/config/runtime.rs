//! Container runtime, build and resource-cap configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::port::outbound::runtime::ResourceLimits;

/// How the container runtime is driven.
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Runtime CLI binary (default: `docker`).
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Timeout for run/start/kill/remove/stats/logs calls, in seconds.
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,
    /// Timeout for image builds, in seconds.
    #[serde(default = "default_build_timeout_secs")]
    pub build_timeout_secs: u64,
    /// Memory cap per container in MiB.
    #[serde(default = "default_memory_mib")]
    pub memory_mib: u64,
    /// CPU share per container.
    #[serde(default = "default_cpus")]
    pub cpus: f64,
}

fn default_binary() -> String {
    "docker".to_string()
}

const fn default_command_timeout_secs() -> u64 {
    30
}

const fn default_build_timeout_secs() -> u64 {
    600
}

const fn default_memory_mib() -> u64 {
    512
}

const fn default_cpus() -> f64 {
    0.25
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            command_timeout_secs: default_command_timeout_secs(),
            build_timeout_secs: default_build_timeout_secs(),
            memory_mib: default_memory_mib(),
            cpus: default_cpus(),
        }
    }
}

impl RuntimeConfig {
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    #[must_use]
    pub const fn build_timeout(&self) -> Duration {
        Duration::from_secs(self.build_timeout_secs)
    }

    /// Caps applied to every new container.
    #[must_use]
    pub fn limits(&self) -> ResourceLimits {
        ResourceLimits {
            memory_mib: self.memory_mib,
            cpus: self.cpus,
        }
    }
}

/// Where declared environment variables are injected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvInjection {
    /// Passed to the container when it is created; the image stays env-free.
    #[default]
    Runtime,
    /// Baked into the image entrypoint as leading `KEY=value` arguments.
    Entrypoint,
}

/// Build pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BuildConfig {
    #[serde(default)]
    pub env_injection: EnvInjection,
}

/// Per-tenant admission limits.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Maximum number of workloads one tenant may hold.
    #[serde(default = "default_max_workloads")]
    pub max_workloads_per_tenant: u32,
    /// Maximum accepted archive size in bytes (default 1 GB).
    #[serde(default = "default_max_archive_bytes")]
    pub max_archive_bytes: u64,
}

const fn default_max_workloads() -> u32 {
    3
}

const fn default_max_archive_bytes() -> u64 {
    1_000_000_000
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_workloads_per_tenant: default_max_workloads(),
            max_archive_bytes: default_max_archive_bytes(),
        }
    }
}

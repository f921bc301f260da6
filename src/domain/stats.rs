//! Telemetry domain types.
//!
//! Point-in-time resource usage reported by the container runtime and the
//! derived snapshots surfaced to callers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::id::{TenantId, WorkloadName};
use super::workload::{ReviewState, Workload};

/// Point-in-time resource usage of a single container.
///
/// Usage columns are kept as the runtime renders them (`"12MiB / 512MiB"`);
/// percentages and the process count are parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceUsage {
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_usage: String,
    pub block_io: String,
    pub net_io: String,
    pub pids: u32,
}

impl ResourceUsage {
    /// Usage of a container that is not consuming anything.
    #[must_use]
    pub fn zero() -> Self {
        Self {
            cpu_percent: 0.0,
            memory_percent: 0.0,
            memory_usage: "0B / 0B".to_string(),
            block_io: "0B / 0B".to_string(),
            net_io: "0B / 0B".to_string(),
            pids: 0,
        }
    }

    /// Whether the container has any live process.
    #[must_use]
    pub const fn has_processes(&self) -> bool {
        self.pids > 0
    }
}

impl Default for ResourceUsage {
    fn default() -> Self {
        Self::zero()
    }
}

/// Observed status of a workload as shown to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadStatus {
    /// Awaiting operator review; nothing to observe.
    Verifying,
    /// Built but no live process.
    Stopped,
    /// Container has live processes and was started.
    Running,
}

impl WorkloadStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Verifying => "verifying",
            Self::Stopped => "stopped",
            Self::Running => "running",
        }
    }
}

impl fmt::Display for WorkloadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reconciled stats view of one workload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatSnapshot {
    pub tenant: TenantId,
    pub name: WorkloadName,
    pub status: WorkloadStatus,
    pub running: bool,
    pub usage: ResourceUsage,
    pub observed_at: DateTime<Utc>,
}

impl StatSnapshot {
    /// Snapshot synthesized from the catalog alone, without asking the runtime.
    #[must_use]
    pub fn idle(workload: &Workload) -> Self {
        let status = match workload.state {
            ReviewState::AwaitingReview => WorkloadStatus::Verifying,
            ReviewState::Built => WorkloadStatus::Stopped,
        };
        Self {
            tenant: workload.tenant.clone(),
            name: workload.name.clone(),
            status,
            running: false,
            usage: ResourceUsage::zero(),
            observed_at: Utc::now(),
        }
    }

    /// Snapshot from runtime usage, given the reconciled running flag.
    #[must_use]
    pub fn observed(workload: &Workload, usage: ResourceUsage, running: bool) -> Self {
        Self {
            tenant: workload.tenant.clone(),
            name: workload.name.clone(),
            status: if running {
                WorkloadStatus::Running
            } else {
                WorkloadStatus::Stopped
            },
            running,
            usage,
            observed_at: Utc::now(),
        }
    }
}

/// One push of a log subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogChunk {
    /// When true, `lines` is the whole buffer and replaces anything shown so far.
    pub reset: bool,
    pub lines: Vec<String>,
}

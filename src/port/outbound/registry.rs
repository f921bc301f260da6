//! Workload registry port.
//!
//! The durable per-tenant catalog of workloads. Mutations are expressed as
//! targeted updates so concurrent writers touching different fields of the
//! same tenant do not clobber each other.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{ReviewState, RuntimeHandle, TenantId, Workload, WorkloadKey};
use crate::error::Result;

/// Field-level patch of a workload record. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkloadPatch {
    pub state: Option<ReviewState>,
    pub running: Option<bool>,
    /// `Some(None)` clears the handle.
    pub runtime_handle: Option<Option<RuntimeHandle>>,
    /// `Some(None)` clears the archive path.
    pub archive_path: Option<Option<PathBuf>>,
    /// Apply only if the record was last written at this instant.
    pub unchanged_since: Option<DateTime<Utc>>,
}

impl WorkloadPatch {
    /// Patch only the advisory running flag.
    #[must_use]
    pub fn running(running: bool) -> Self {
        Self {
            running: Some(running),
            ..Self::default()
        }
    }

    /// Record a newly created container as running.
    #[must_use]
    pub fn started(handle: RuntimeHandle) -> Self {
        Self {
            running: Some(true),
            runtime_handle: Some(Some(handle)),
            ..Self::default()
        }
    }

    /// Mark the image built and drop the pending archive reference.
    #[must_use]
    pub fn built() -> Self {
        Self {
            state: Some(ReviewState::Built),
            archive_path: Some(None),
            ..Self::default()
        }
    }

    /// Forget a container the runtime no longer knows about.
    #[must_use]
    pub fn container_gone() -> Self {
        Self {
            running: Some(false),
            runtime_handle: Some(None),
            ..Self::default()
        }
    }

    /// Make the patch conditional on the record not having been written
    /// since `observed` was read.
    #[must_use]
    pub fn if_unchanged(mut self, observed: &Workload) -> Self {
        self.unchanged_since = Some(observed.updated_at);
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Whether the guard, if any, admits this record.
    #[must_use]
    pub fn admits(&self, workload: &Workload) -> bool {
        self.unchanged_since
            .map_or(true, |since| since == workload.updated_at)
    }

    /// Apply the patch to an in-memory record.
    pub fn apply(&self, workload: &mut Workload) {
        if let Some(state) = self.state {
            workload.state = state;
        }
        if let Some(running) = self.running {
            workload.running = running;
        }
        if let Some(handle) = &self.runtime_handle {
            workload.runtime_handle.clone_from(handle);
        }
        if let Some(archive) = &self.archive_path {
            workload.archive_path.clone_from(archive);
        }
    }
}

/// How [`WorkloadRegistry::upsert`] changes a record.
#[derive(Debug, Clone)]
pub enum WorkloadUpdate {
    /// Insert or overwrite the whole record.
    Replace(Workload),
    /// Change selected fields of an existing record.
    Patch(WorkloadPatch),
}

/// Durable catalog of workloads, partitioned by tenant.
#[async_trait]
pub trait WorkloadRegistry: Send + Sync {
    /// Get a workload by key.
    async fn get(&self, key: &WorkloadKey) -> Result<Option<Workload>>;

    /// List a tenant's workloads ordered by name.
    async fn list(&self, tenant: &TenantId) -> Result<Vec<Workload>>;

    /// Keys of all workloads awaiting review, oldest first.
    async fn list_pending(&self) -> Result<Vec<WorkloadKey>>;

    /// Number of workloads a tenant holds.
    async fn count(&self, tenant: &TenantId) -> Result<u64>;

    /// Insert a new record.
    ///
    /// # Errors
    /// Fails with `ValidationError::Duplicate` if the key exists.
    async fn insert(&self, workload: Workload) -> Result<Workload>;

    /// Apply an update atomically and return the new persisted record.
    ///
    /// A guarded patch the current record does not admit is skipped and the
    /// record is returned unchanged.
    ///
    /// # Errors
    /// A patch against a missing key fails with `Error::NotFound`.
    async fn upsert(&self, key: &WorkloadKey, update: WorkloadUpdate) -> Result<Workload>;

    /// Remove a record. Returns whether it existed.
    async fn remove(&self, key: &WorkloadKey) -> Result<bool>;
}

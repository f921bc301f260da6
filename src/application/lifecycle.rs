//! Start, stop and delete of built workloads.
//!
//! All three operations hold the workload's lifecycle lock for their whole
//! duration, so they linearize per key while different keys run freely.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::archive::ArchiveStore;
use super::lock::KeyedLocks;
use crate::domain::{ValidationError, Workload, WorkloadKey};
use crate::error::{Error, Result};
use crate::infrastructure::config::EnvInjection;
use crate::port::outbound::registry::{WorkloadPatch, WorkloadRegistry, WorkloadUpdate};
use crate::port::outbound::runtime::{ContainerRuntime, ResourceLimits, RunSpec};

/// Drives the runtime-facing state of workloads.
pub struct LifecycleController {
    registry: Arc<dyn WorkloadRegistry>,
    runtime: Arc<dyn ContainerRuntime>,
    archives: ArchiveStore,
    locks: Arc<KeyedLocks<WorkloadKey>>,
    limits: ResourceLimits,
    injection: EnvInjection,
}

impl LifecycleController {
    pub fn new(
        registry: Arc<dyn WorkloadRegistry>,
        runtime: Arc<dyn ContainerRuntime>,
        archives: ArchiveStore,
        locks: Arc<KeyedLocks<WorkloadKey>>,
        limits: ResourceLimits,
        injection: EnvInjection,
    ) -> Self {
        Self {
            registry,
            runtime,
            archives,
            locks,
            limits,
            injection,
        }
    }

    async fn fetch(&self, key: &WorkloadKey) -> Result<Workload> {
        self.registry
            .get(key)
            .await?
            .ok_or_else(|| Error::not_found(key))
    }

    fn run_spec(&self, workload: &Workload) -> RunSpec {
        RunSpec {
            image: workload.image(),
            limits: self.limits.clone(),
            environment: match self.injection {
                EnvInjection::Runtime => workload.environment.clone(),
                EnvInjection::Entrypoint => Vec::new(),
            },
        }
    }

    /// Start a built workload, creating its container on first start.
    ///
    /// # Errors
    /// `NotFound`, `ValidationError::NotBuilt`, or `RuntimeUnavailable` when
    /// the runtime call fails. The registry is unchanged on failure.
    #[instrument(skip(self), fields(workload = %key))]
    pub async fn start(&self, key: &WorkloadKey) -> Result<Workload> {
        let _guard = self.locks.lock(key).await;
        let workload = self.fetch(key).await?;
        if !workload.has_build_artifact() {
            return Err(ValidationError::NotBuilt {
                name: key.name.to_string(),
            }
            .into());
        }

        if let Some(handle) = &workload.runtime_handle {
            match self.runtime.start(handle).await {
                Ok(()) => {
                    info!(handle = %handle, "Container resumed");
                    return self
                        .registry
                        .upsert(key, WorkloadUpdate::Patch(WorkloadPatch::running(true)))
                        .await;
                }
                Err(e) if e.is_missing_container() => {
                    warn!(handle = %handle, "Recorded container is gone, creating a new one");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let handle = match self.runtime.run(&self.run_spec(&workload)).await {
            Ok(handle) => handle,
            Err(e) => {
                if workload.runtime_handle.is_some() {
                    self.forget_container(key).await;
                }
                return Err(e.into());
            }
        };

        match self
            .registry
            .upsert(
                key,
                WorkloadUpdate::Patch(WorkloadPatch::started(handle.clone())),
            )
            .await
        {
            Ok(updated) => {
                info!(handle = %handle, "Container created");
                Ok(updated)
            }
            Err(e) => {
                if let Err(rm) = self.runtime.remove_container(&handle).await {
                    warn!(handle = %handle, error = %rm, "Failed to remove unrecorded container");
                }
                Err(e)
            }
        }
    }

    /// Stop a workload. Stopping something already stopped succeeds.
    ///
    /// `running = false` is persisted even when the runtime call fails.
    ///
    /// # Errors
    /// `NotFound`, or `RuntimeUnavailable` for runtime failures other than
    /// "not running" and "no such container".
    #[instrument(skip(self), fields(workload = %key))]
    pub async fn stop(&self, key: &WorkloadKey) -> Result<Workload> {
        let _guard = self.locks.lock(key).await;
        let workload = self.fetch(key).await?;

        let outcome = match &workload.runtime_handle {
            Some(handle) => self.runtime.kill(handle).await,
            None => Ok(()),
        };

        let patch = match &outcome {
            Err(e) if e.is_missing_container() => WorkloadPatch::container_gone(),
            _ => WorkloadPatch::running(false),
        };
        let updated = self
            .registry
            .upsert(key, WorkloadUpdate::Patch(patch))
            .await?;

        match outcome {
            Ok(()) => {
                info!("Workload stopped");
                Ok(updated)
            }
            Err(e) if e.is_already_stopped() => Ok(updated),
            Err(e) => {
                warn!(error = %e, "Kill failed; recorded as stopped");
                Err(e.into())
            }
        }
    }

    /// Delete a workload and everything it owns in the runtime.
    ///
    /// Runtime and file cleanup are best-effort; the registry entry is
    /// always removed.
    ///
    /// # Errors
    /// `NotFound` for an unknown key, or a registry failure.
    #[instrument(skip(self), fields(workload = %key))]
    pub async fn delete(&self, key: &WorkloadKey) -> Result<Workload> {
        let guard = self.locks.lock(key).await;
        let workload = self.fetch(key).await?;

        if let Some(handle) = &workload.runtime_handle {
            if let Err(e) = self.runtime.kill(handle).await {
                if !e.is_already_stopped() {
                    warn!(handle = %handle, error = %e, "Failed to stop container before delete");
                }
            }
            if let Err(e) = self.runtime.remove_container(handle).await {
                if !e.is_missing_container() {
                    warn!(handle = %handle, error = %e, "Failed to remove container");
                }
            }
        }

        let image = workload.image();
        if let Err(e) = self.runtime.remove_image(&image).await {
            warn!(image = %image, error = %e, "Failed to remove image");
        }

        if let Some(archive) = &workload.archive_path {
            self.archives.discard(archive).await;
        }

        self.registry.remove(key).await?;
        drop(guard);
        self.locks.forget(key);

        info!("Workload deleted");
        Ok(workload)
    }

    async fn forget_container(&self, key: &WorkloadKey) {
        if let Err(e) = self
            .registry
            .upsert(key, WorkloadUpdate::Patch(WorkloadPatch::container_gone()))
            .await
        {
            warn!(error = %e, "Failed to clear stale container handle");
        }
    }
}

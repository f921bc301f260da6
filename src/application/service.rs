//! Workload service: the API surface of the lifecycle manager.
//!
//! ```text
//! submit ──> awaiting_review ──decide(approve)──> BuildPipeline ──> built
//!                  │                                   │ (error)
//!                  └──decide(reject)──> removed        └──> awaiting_review
//!
//! built ──start──> running ──stop──> stopped ──start──> running
//!   any state ──delete──> removed
//! ```
//!
//! Operations on one workload are serialized by two per-key locks: a build
//! lock held for the length of an image build (try-acquired, so a second
//! concurrent approval fails fast) and a lifecycle lock held while the
//! registry record and its runtime counterpart change together.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::archive::ArchiveStore;
use super::build::BuildPipeline;
use super::lifecycle::LifecycleController;
use super::lock::KeyedLocks;
use super::telemetry::{Subscription, TelemetryStreamer};
use crate::domain::{
    EnvVar, ImageRef, LogChunk, Message, RuntimeVersion, StatSnapshot, TenantId,
    ValidationError, Workload, WorkloadKey,
};
use crate::error::{BuildError, BuildStep, Error, Result};
use crate::infrastructure::config::Config;
use crate::port::outbound::archive::ArchiveExtractor;
use crate::port::outbound::inbox::Inbox;
use crate::port::outbound::notifier::{Event, Notifier};
use crate::port::outbound::registry::{WorkloadPatch, WorkloadRegistry, WorkloadUpdate};
use crate::port::outbound::runtime::ContainerRuntime;

/// Outcome of an operator review.
#[derive(Debug, Clone)]
pub enum Decision {
    /// The image was built and the workload is runnable.
    Approved { workload: Workload, image: ImageRef },
    /// The workload and its archive were discarded.
    Rejected { workload: Workload },
}

/// Outbound dependencies of the service.
pub struct ServicePorts {
    pub registry: Arc<dyn WorkloadRegistry>,
    pub runtime: Arc<dyn ContainerRuntime>,
    pub extractor: Arc<dyn ArchiveExtractor>,
    pub inbox: Arc<dyn Inbox>,
    pub notifier: Arc<dyn Notifier>,
}

/// Multi-tenant workload lifecycle manager.
pub struct WorkloadService {
    registry: Arc<dyn WorkloadRegistry>,
    runtime: Arc<dyn ContainerRuntime>,
    inbox: Arc<dyn Inbox>,
    notifier: Arc<dyn Notifier>,
    archives: ArchiveStore,
    pipeline: BuildPipeline,
    lifecycle: LifecycleController,
    telemetry: Arc<TelemetryStreamer>,
    build_locks: KeyedLocks<WorkloadKey>,
    lifecycle_locks: Arc<KeyedLocks<WorkloadKey>>,
    submit_locks: KeyedLocks<TenantId>,
    max_workloads: u32,
    max_archive_bytes: u64,
}

impl WorkloadService {
    pub fn new(config: &Config, ports: ServicePorts) -> Self {
        let archives = ArchiveStore::new(config.storage.pending_dir());
        let lifecycle_locks = Arc::new(KeyedLocks::new());
        let pipeline = BuildPipeline::new(
            Arc::clone(&ports.runtime),
            ports.extractor,
            config.storage.build_dir(),
            config.build.env_injection,
        );
        let lifecycle = LifecycleController::new(
            Arc::clone(&ports.registry),
            Arc::clone(&ports.runtime),
            archives.clone(),
            Arc::clone(&lifecycle_locks),
            config.runtime.limits(),
            config.build.env_injection,
        );
        let telemetry = Arc::new(TelemetryStreamer::new(
            Arc::clone(&ports.registry),
            Arc::clone(&ports.runtime),
            &config.telemetry,
        ));

        Self {
            registry: ports.registry,
            runtime: ports.runtime,
            inbox: ports.inbox,
            notifier: ports.notifier,
            archives,
            pipeline,
            lifecycle,
            telemetry,
            build_locks: KeyedLocks::new(),
            lifecycle_locks,
            submit_locks: KeyedLocks::new(),
            max_workloads: config.limits.max_workloads_per_tenant,
            max_archive_bytes: config.limits.max_archive_bytes,
        }
    }

    async fn fetch(&self, key: &WorkloadKey) -> Result<Workload> {
        self.registry
            .get(key)
            .await?
            .ok_or_else(|| Error::not_found(key))
    }

    async fn fetch_pending(&self, key: &WorkloadKey) -> Result<Workload> {
        let workload = self.fetch(key).await?;
        if !workload.is_pending() {
            return Err(ValidationError::NotPending {
                name: key.name.to_string(),
            }
            .into());
        }
        Ok(workload)
    }

    /// Register an uploaded archive as a new workload awaiting review.
    ///
    /// # Errors
    /// `ValidationError` for a bad tenant/name/version, an empty or
    /// oversized archive, a duplicate name, or an exhausted quota. Nothing is
    /// stored when validation fails.
    #[instrument(skip(self, archive, environment), fields(size = archive.len()))]
    pub async fn submit_workload(
        &self,
        tenant: &str,
        name: &str,
        archive: &[u8],
        runtime_version: Option<&str>,
        environment: Vec<EnvVar>,
    ) -> Result<Workload> {
        let key = WorkloadKey::parse(tenant, name)?;
        let runtime_version = RuntimeVersion::parse(runtime_version)?;

        if archive.is_empty() {
            return Err(ValidationError::MissingArchive {
                name: key.name.to_string(),
            }
            .into());
        }
        let size = archive.len() as u64;
        if size > self.max_archive_bytes {
            return Err(ValidationError::ArchiveTooLarge {
                size,
                limit: self.max_archive_bytes,
            }
            .into());
        }

        let _guard = self.submit_locks.lock(&key.tenant).await;
        if self.registry.get(&key).await?.is_some() {
            return Err(ValidationError::Duplicate {
                tenant: key.tenant.to_string(),
                name: key.name.to_string(),
            }
            .into());
        }
        if self.registry.count(&key.tenant).await? >= u64::from(self.max_workloads) {
            return Err(ValidationError::QuotaExceeded {
                tenant: key.tenant.to_string(),
                limit: self.max_workloads,
            }
            .into());
        }

        let path = self.archives.save(&key, archive).await?;
        let workload = Workload::pending(key.clone(), runtime_version, environment, path.clone());
        let stored = match self.registry.insert(workload).await {
            Ok(stored) => stored,
            Err(e) => {
                self.archives.discard(&path).await;
                return Err(e);
            }
        };

        info!(workload = %key, "Workload submitted for review");
        self.notifier.notify(Event::Submitted { key });
        Ok(stored)
    }

    /// Record the operator's review decision.
    ///
    /// Approval builds the image; the workload becomes `built` only if the
    /// build succeeds. Rejection removes the record and its archive.
    ///
    /// # Errors
    /// `NotFound`, `ValidationError::NotPending`, `BuildError` on a failed or
    /// concurrent build, `ValidationError::BuildInProgress` when rejecting
    /// during a build.
    #[instrument(skip(self))]
    pub async fn decide(&self, tenant: &str, name: &str, approve: bool) -> Result<Decision> {
        let key = WorkloadKey::parse(tenant, name)?;
        if approve {
            self.approve(key).await
        } else {
            self.reject(key).await
        }
    }

    async fn approve(&self, key: WorkloadKey) -> Result<Decision> {
        let Some(build) = self.build_locks.try_lock(&key) else {
            return Err(BuildError::new(
                BuildStep::Prepare,
                format!("a build for {key} is already in progress"),
            )
            .into());
        };

        // Read under the build lock: a build that finished just before it
        // was taken has already consumed the archive.
        let workload = match self.fetch_pending(&key).await {
            Ok(workload) => workload,
            Err(e) => {
                drop(build);
                self.build_locks.forget(&key);
                return Err(e);
            }
        };

        let artifact = match self.pipeline.build(&workload).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!(workload = %key, step = %e.step, error = %e.message, "Build failed");
                self.notifier.notify(Event::BuildFailed {
                    key,
                    step: e.step,
                    message: e.message.clone(),
                });
                return Err(e.into());
            }
        };

        let _lifecycle = self.lifecycle_locks.lock(&key).await;
        let current = self.registry.get(&key).await?;
        let same_upload = current.is_some_and(|current| {
            current.is_pending() && current.created_at == workload.created_at
        });
        if !same_upload {
            warn!(workload = %key, "Workload replaced or deleted during build, discarding image");
            if let Err(e) = self.runtime.remove_image(&artifact.image).await {
                warn!(image = %artifact.image, error = %e, "Failed to remove orphaned image");
            }
            return Err(Error::not_found(&key));
        }

        let updated = self
            .registry
            .upsert(&key, WorkloadUpdate::Patch(WorkloadPatch::built()))
            .await?;
        if let Some(archive) = &workload.archive_path {
            self.archives.discard(archive).await;
        }

        info!(workload = %key, image = %artifact.image, "Workload approved");
        self.notifier.notify(Event::Approved {
            key,
            image: artifact.image.clone(),
        });
        Ok(Decision::Approved {
            workload: updated,
            image: artifact.image,
        })
    }

    async fn reject(&self, key: WorkloadKey) -> Result<Decision> {
        let Some(build) = self.build_locks.try_lock(&key) else {
            return Err(ValidationError::BuildInProgress {
                name: key.name.to_string(),
            }
            .into());
        };
        let lifecycle = self.lifecycle_locks.lock(&key).await;

        let removed = self.remove_pending(&key).await;
        drop(lifecycle);
        drop(build);
        self.lifecycle_locks.forget(&key);
        self.build_locks.forget(&key);
        let workload = removed?;

        info!(workload = %key, "Workload rejected");
        self.notifier.notify(Event::Rejected { key });
        Ok(Decision::Rejected { workload })
    }

    async fn remove_pending(&self, key: &WorkloadKey) -> Result<Workload> {
        let workload = self.fetch_pending(key).await?;
        self.registry.remove(key).await?;
        if let Some(archive) = &workload.archive_path {
            self.archives.discard(archive).await;
        }
        Ok(workload)
    }

    /// Start a built workload.
    ///
    /// # Errors
    /// See [`LifecycleController::start`].
    pub async fn start(&self, tenant: &str, name: &str) -> Result<Workload> {
        let key = WorkloadKey::parse(tenant, name)?;
        let workload = self.lifecycle.start(&key).await?;
        if let Some(handle) = &workload.runtime_handle {
            self.notifier.notify(Event::Started {
                key,
                handle: handle.clone(),
            });
        }
        Ok(workload)
    }

    /// Stop a workload.
    ///
    /// # Errors
    /// See [`LifecycleController::stop`].
    pub async fn stop(&self, tenant: &str, name: &str) -> Result<Workload> {
        let key = WorkloadKey::parse(tenant, name)?;
        let result = self.lifecycle.stop(&key).await;
        // A failed kill is reported after the workload is recorded stopped.
        if matches!(result, Ok(_) | Err(Error::RuntimeUnavailable(_))) {
            self.notifier.notify(Event::Stopped { key });
        }
        result
    }

    /// Delete a workload in any state. Returns the removed record.
    ///
    /// # Errors
    /// See [`LifecycleController::delete`].
    pub async fn delete(&self, tenant: &str, name: &str) -> Result<Workload> {
        let key = WorkloadKey::parse(tenant, name)?;
        let workload = self.lifecycle.delete(&key).await?;
        self.build_locks.forget(&key);
        self.notifier.notify(Event::Deleted { key });
        Ok(workload)
    }

    /// Get one workload.
    ///
    /// # Errors
    /// `NotFound` for an unknown key.
    pub async fn get(&self, tenant: &str, name: &str) -> Result<Workload> {
        let key = WorkloadKey::parse(tenant, name)?;
        self.fetch(&key).await
    }

    /// All workloads of a tenant, ordered by name.
    ///
    /// # Errors
    /// `ValidationError` for a malformed tenant handle.
    pub async fn list(&self, tenant: &str) -> Result<Vec<Workload>> {
        let tenant = TenantId::parse(tenant)?;
        self.registry.list(&tenant).await
    }

    /// Workloads awaiting operator review, oldest first.
    ///
    /// # Errors
    /// Propagates registry failures.
    pub async fn list_pending_reviews(&self) -> Result<Vec<WorkloadKey>> {
        self.registry.list_pending().await
    }

    /// Reconciled stats of a workload.
    ///
    /// # Errors
    /// See [`TelemetryStreamer::stats`].
    pub async fn get_stats(&self, tenant: &str, name: &str) -> Result<StatSnapshot> {
        let key = WorkloadKey::parse(tenant, name)?;
        self.telemetry.stats(&key).await
    }

    /// Sanitized log buffer of a workload.
    ///
    /// # Errors
    /// See [`TelemetryStreamer::logs`].
    pub async fn get_logs(&self, tenant: &str, name: &str) -> Result<Vec<String>> {
        let key = WorkloadKey::parse(tenant, name)?;
        self.telemetry.logs(&key).await
    }

    /// Live stats of a workload until the subscription is dropped.
    ///
    /// # Errors
    /// `NotFound` for an unknown key.
    pub async fn subscribe_stats(
        &self,
        tenant: &str,
        name: &str,
    ) -> Result<Subscription<StatSnapshot>> {
        let key = WorkloadKey::parse(tenant, name)?;
        self.telemetry.subscribe_stats(&key).await
    }

    /// Live log updates of a workload until the subscription is dropped.
    ///
    /// # Errors
    /// `NotFound` for an unknown key.
    pub async fn subscribe_logs(&self, tenant: &str, name: &str) -> Result<Subscription<LogChunk>> {
        let key = WorkloadKey::parse(tenant, name)?;
        self.telemetry.subscribe_logs(&key).await
    }

    /// Read and clear a tenant's inbox.
    ///
    /// # Errors
    /// `ValidationError` for a malformed tenant handle, or a storage failure.
    pub fn drain_messages(&self, tenant: &str) -> Result<Vec<Message>> {
        let tenant = TenantId::parse(tenant)?;
        self.inbox.drain(&tenant)
    }
}

//! Live stats and log views of workloads.
//!
//! Both views are derived from the runtime and never authoritative. The
//! stats view reconciles the stored `running` flag downward only: a
//! container with no processes (or no container at all) is recorded as not
//! running, but nothing here ever records a workload as running.

pub mod sanitize;
pub mod subscription;

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, instrument, warn};

use crate::domain::{LogChunk, ResourceUsage, StatSnapshot, Workload, WorkloadKey};
use crate::error::{Error, Result};
use crate::infrastructure::config::TelemetryConfig;
use crate::port::outbound::registry::{WorkloadPatch, WorkloadRegistry, WorkloadUpdate};
use crate::port::outbound::runtime::{ContainerRuntime, RuntimeError};

pub use sanitize::sanitize_line;
pub use subscription::Subscription;

/// Polls the runtime for stats and logs.
pub struct TelemetryStreamer {
    registry: Arc<dyn WorkloadRegistry>,
    runtime: Arc<dyn ContainerRuntime>,
    poll_interval: Duration,
    poll_timeout: Duration,
    capacity: usize,
}

impl TelemetryStreamer {
    pub fn new(
        registry: Arc<dyn WorkloadRegistry>,
        runtime: Arc<dyn ContainerRuntime>,
        config: &TelemetryConfig,
    ) -> Self {
        Self {
            registry,
            runtime,
            poll_interval: config.poll_interval(),
            poll_timeout: config.poll_timeout(),
            capacity: config.channel_capacity,
        }
    }

    async fn fetch(&self, key: &WorkloadKey) -> Result<Workload> {
        self.registry
            .get(key)
            .await?
            .ok_or_else(|| Error::not_found(key))
    }

    /// Current reconciled stats of a workload.
    ///
    /// # Errors
    /// `NotFound`, or `RuntimeUnavailable` if the runtime query fails for a
    /// reason other than the container being gone.
    #[instrument(skip(self), fields(workload = %key))]
    pub async fn stats(&self, key: &WorkloadKey) -> Result<StatSnapshot> {
        let workload = self.fetch(key).await?;
        let Some(handle) = workload.runtime_handle.clone() else {
            return Ok(StatSnapshot::idle(&workload));
        };

        let queried = timeout(self.poll_timeout, self.runtime.stats(&handle))
            .await
            .unwrap_or(Err(RuntimeError::Timeout {
                operation: "stats",
                after: self.poll_timeout,
            }));

        match queried {
            Ok(usage) => {
                let running = workload.running && usage.has_processes();
                if workload.running && !running {
                    self.downgrade(key, WorkloadPatch::running(false).if_unchanged(&workload))
                        .await;
                }
                Ok(StatSnapshot::observed(&workload, usage, running))
            }
            Err(e) if e.is_missing_container() => {
                self.downgrade(key, WorkloadPatch::container_gone().if_unchanged(&workload))
                    .await;
                Ok(StatSnapshot::observed(&workload, ResourceUsage::zero(), false))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Persist a downgrade computed from an earlier read. A lifecycle
    /// operation that wrote the record in between wins.
    async fn downgrade(&self, key: &WorkloadKey, patch: WorkloadPatch) {
        match self.registry.upsert(key, WorkloadUpdate::Patch(patch)).await {
            Ok(stored) => debug!(workload = %key, running = stored.running, "Reconciled running flag"),
            Err(e) => warn!(workload = %key, error = %e, "Failed to persist running downgrade"),
        }
    }

    /// Full sanitized log buffer. Empty when no container exists.
    ///
    /// # Errors
    /// `NotFound`, or `RuntimeUnavailable` if the runtime query fails.
    pub async fn logs(&self, key: &WorkloadKey) -> Result<Vec<String>> {
        let workload = self.fetch(key).await?;
        let Some(handle) = workload.runtime_handle else {
            return Ok(Vec::new());
        };

        let queried = timeout(self.poll_timeout, self.runtime.logs(&handle))
            .await
            .unwrap_or(Err(RuntimeError::Timeout {
                operation: "logs",
                after: self.poll_timeout,
            }));

        match queried {
            Ok(lines) => Ok(lines.iter().map(|line| sanitize_line(line)).collect()),
            Err(e) if e.is_missing_container() => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Stream stats snapshots every poll interval until dropped.
    ///
    /// Failed ticks are skipped. The stream ends if the workload is deleted.
    ///
    /// # Errors
    /// `NotFound` if the workload does not exist when subscribing.
    pub async fn subscribe_stats(
        self: &Arc<Self>,
        key: &WorkloadKey,
    ) -> Result<Subscription<StatSnapshot>> {
        self.fetch(key).await?;
        let streamer = Arc::clone(self);
        let key = key.clone();

        Ok(Subscription::spawn(self.capacity, move |tx| async move {
            let mut ticker = interval(streamer.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    () = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                match streamer.stats(&key).await {
                    Ok(snapshot) => {
                        if tx.send(snapshot).await.is_err() {
                            break;
                        }
                    }
                    Err(e) if e.is_not_found() => break,
                    Err(e) => debug!(workload = %key, error = %e, "Skipping stats tick"),
                }
            }
            debug!(workload = %key, "Stats subscription closed");
        }))
    }

    /// Stream log updates every poll interval until dropped.
    ///
    /// The first chunk holds the whole buffer; later chunks hold only new
    /// lines unless the buffer was truncated, which resends it in full.
    ///
    /// # Errors
    /// `NotFound` if the workload does not exist when subscribing.
    pub async fn subscribe_logs(self: &Arc<Self>, key: &WorkloadKey) -> Result<Subscription<LogChunk>> {
        self.fetch(key).await?;
        let streamer = Arc::clone(self);
        let key = key.clone();

        Ok(Subscription::spawn(self.capacity, move |tx| async move {
            let mut ticker = interval(streamer.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seen: Option<Vec<String>> = None;

            loop {
                tokio::select! {
                    () = tx.closed() => break,
                    _ = ticker.tick() => {}
                }

                match streamer.logs(&key).await {
                    Ok(lines) => {
                        if let Some(chunk) = next_chunk(seen.as_deref(), &lines) {
                            if tx.send(chunk).await.is_err() {
                                break;
                            }
                        }
                        seen = Some(lines);
                    }
                    Err(e) if e.is_not_found() => break,
                    Err(e) => debug!(workload = %key, error = %e, "Skipping logs tick"),
                }
            }
            debug!(workload = %key, "Log subscription closed");
        }))
    }
}

/// Difference between the previously pushed buffer and the current one.
fn next_chunk(previous: Option<&[String]>, current: &[String]) -> Option<LogChunk> {
    match previous {
        None => Some(LogChunk {
            reset: true,
            lines: current.to_vec(),
        }),
        Some(prev) if current.len() >= prev.len() && current[..prev.len()] == *prev => {
            if current.len() == prev.len() {
                None
            } else {
                Some(LogChunk {
                    reset: false,
                    lines: current[prev.len()..].to_vec(),
                })
            }
        }
        Some(_) => Some(LogChunk {
            reset: true,
            lines: current.to_vec(),
        }),
    }
}

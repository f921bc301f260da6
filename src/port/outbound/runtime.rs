//! Container runtime port.
//!
//! The only seam through which the system talks to an out-of-process
//! container engine. Every method returns a typed [`RuntimeError`] so callers
//! can distinguish "already stopped" or "gone" from a real outage.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{EnvVar, ImageRef, ResourceUsage, RuntimeHandle};

/// Failures reported by a container runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// The referenced container does not exist (never created or removed).
    #[error("no such container: {0}")]
    NoSuchContainer(String),

    /// The container exists but is not running.
    #[error("container {0} is not running")]
    NotRunning(String),

    /// The runtime did not answer within the allotted time.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// The runtime command ran and reported failure.
    #[error("{operation} failed (exit {exit_code:?}): {stderr}")]
    CommandFailed {
        operation: &'static str,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// The runtime binary could not be launched.
    #[error("failed to launch runtime: {0}")]
    Spawn(String),

    /// The runtime answered with output that could not be understood.
    #[error("unexpected runtime output: {0}")]
    Parse(String),
}

impl RuntimeError {
    /// Whether the error means the container is already not running.
    ///
    /// Stop treats these as success.
    #[must_use]
    pub const fn is_already_stopped(&self) -> bool {
        matches!(self, Self::NotRunning(_) | Self::NoSuchContainer(_))
    }

    #[must_use]
    pub const fn is_missing_container(&self) -> bool {
        matches!(self, Self::NoSuchContainer(_))
    }
}

/// Resource caps applied when a container is created.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceLimits {
    /// Memory cap in MiB.
    pub memory_mib: u64,
    /// CPU share (e.g. `0.25` = a quarter of one core).
    pub cpus: f64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            memory_mib: 512,
            cpus: 0.25,
        }
    }
}

/// Everything needed to create a new container.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub image: ImageRef,
    pub limits: ResourceLimits,
    /// Variables passed to the container at creation; empty when they are
    /// baked into the image entrypoint instead.
    pub environment: Vec<EnvVar>,
}

/// Output of a successful image build.
#[derive(Debug, Clone, Default)]
pub struct BuildOutput {
    /// Combined build log.
    pub log: String,
}

/// Typed client for an external container runtime.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Build an image from a prepared build context directory.
    async fn build_image(&self, context: &Path, image: &ImageRef)
        -> Result<BuildOutput, RuntimeError>;

    /// Create and start a new detached container, returning its handle.
    async fn run(&self, spec: &RunSpec) -> Result<RuntimeHandle, RuntimeError>;

    /// Start an existing (stopped) container.
    async fn start(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError>;

    /// Kill a running container.
    async fn kill(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError>;

    /// Forcefully remove a container.
    async fn remove_container(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError>;

    /// Forcefully remove an image.
    async fn remove_image(&self, image: &ImageRef) -> Result<(), RuntimeError>;

    /// Point-in-time resource usage of a container.
    async fn stats(&self, handle: &RuntimeHandle) -> Result<ResourceUsage, RuntimeError>;

    /// Full captured log buffer of a container, one entry per line.
    async fn logs(&self, handle: &RuntimeHandle) -> Result<Vec<String>, RuntimeError>;

    /// Get the runtime name for logging/debugging.
    fn runtime_name(&self) -> &'static str;
}

//! In-memory [`ContainerRuntime`] for tests.
//!
//! Tracks images and containers the way a local engine would, records every
//! call, and lets tests script failures and process counts.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::domain::{EnvVar, ImageRef, ResourceUsage, RuntimeHandle};
use crate::port::outbound::runtime::{BuildOutput, ContainerRuntime, RunSpec, RuntimeError};

/// Runtime operation names, as used by [`FakeRuntime::fail_next`].
pub mod op {
    pub const BUILD: &str = "build";
    pub const RUN: &str = "run";
    pub const START: &str = "start";
    pub const KILL: &str = "kill";
    pub const RM: &str = "rm";
    pub const RMI: &str = "rmi";
    pub const STATS: &str = "stats";
    pub const LOGS: &str = "logs";
}

/// A recorded runtime call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCall {
    pub op: &'static str,
    /// Image tag or container handle the call targeted.
    pub target: String,
}

/// Snapshot of a fake container.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeContainer {
    pub image: String,
    pub running: bool,
    pub pids: u32,
    pub environment: Vec<EnvVar>,
    pub limits_memory_mib: u64,
    pub limits_cpus: f64,
    pub logs: Vec<String>,
}

/// Files of a build context captured at build time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildRecord {
    pub image: String,
    pub dockerfile: String,
    pub dockerignore: Option<String>,
    pub files: Vec<String>,
}

#[derive(Default)]
struct State {
    images: HashSet<String>,
    containers: HashMap<String, FakeContainer>,
    next_id: u64,
    calls: Vec<RuntimeCall>,
    failures: HashMap<&'static str, VecDeque<RuntimeError>>,
    builds: Vec<BuildRecord>,
}

/// Fake container engine.
#[derive(Default)]
pub struct FakeRuntime {
    state: Mutex<State>,
    build_delay: Mutex<Option<Duration>>,
    stats_delay: Mutex<Option<Duration>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `error`.
    pub fn fail_next(&self, op: &'static str, error: RuntimeError) {
        self.state
            .lock()
            .failures
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Delay every image build, keeping the build in flight.
    pub fn set_build_delay(&self, delay: Duration) {
        *self.build_delay.lock() = Some(delay);
    }

    /// Delay every stats call.
    pub fn set_stats_delay(&self, delay: Duration) {
        *self.stats_delay.lock() = Some(delay);
    }

    /// Set the process count a container reports.
    pub fn set_pids(&self, handle: &RuntimeHandle, pids: u32) {
        if let Some(container) = self.state.lock().containers.get_mut(handle.as_str()) {
            container.pids = pids;
            if pids == 0 {
                container.running = false;
            }
        }
    }

    /// Append lines to a container's log buffer.
    pub fn push_logs(&self, handle: &RuntimeHandle, lines: &[&str]) {
        if let Some(container) = self.state.lock().containers.get_mut(handle.as_str()) {
            container
                .logs
                .extend(lines.iter().map(|line| (*line).to_string()));
        }
    }

    /// Replace a container's log buffer.
    pub fn set_logs(&self, handle: &RuntimeHandle, lines: &[&str]) {
        if let Some(container) = self.state.lock().containers.get_mut(handle.as_str()) {
            container.logs = lines.iter().map(|line| (*line).to_string()).collect();
        }
    }

    /// Remove a container behind the manager's back.
    pub fn vanish(&self, handle: &RuntimeHandle) {
        self.state.lock().containers.remove(handle.as_str());
    }

    pub fn container(&self, handle: &RuntimeHandle) -> Option<FakeContainer> {
        self.state.lock().containers.get(handle.as_str()).cloned()
    }

    pub fn container_count(&self) -> usize {
        self.state.lock().containers.len()
    }

    pub fn has_image(&self, image: &str) -> bool {
        self.state.lock().images.contains(image)
    }

    pub fn calls(&self) -> Vec<RuntimeCall> {
        self.state.lock().calls.clone()
    }

    /// Number of recorded calls of `op`.
    pub fn count(&self, op: &str) -> usize {
        self.state.lock().calls.iter().filter(|c| c.op == op).count()
    }

    pub fn builds(&self) -> Vec<BuildRecord> {
        self.state.lock().builds.clone()
    }

    pub fn last_build(&self) -> Option<BuildRecord> {
        self.state.lock().builds.last().cloned()
    }

    fn begin(&self, op: &'static str, target: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock();
        state.calls.push(RuntimeCall {
            op,
            target: target.to_string(),
        });
        match state.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

fn no_such(handle: &RuntimeHandle) -> RuntimeError {
    RuntimeError::NoSuchContainer(format!("No such container: {handle}"))
}

fn capture_context(context: &Path, image: &ImageRef) -> BuildRecord {
    let mut files: Vec<String> = std::fs::read_dir(context)
        .map(|entries| {
            entries
                .filter_map(std::result::Result::ok)
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    files.sort();

    BuildRecord {
        image: image.to_string(),
        dockerfile: std::fs::read_to_string(context.join("Dockerfile")).unwrap_or_default(),
        dockerignore: std::fs::read_to_string(context.join(".dockerignore")).ok(),
        files,
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn build_image(
        &self,
        context: &Path,
        image: &ImageRef,
    ) -> Result<BuildOutput, RuntimeError> {
        self.begin(op::BUILD, image.as_str())?;
        let record = capture_context(context, image);

        let delay = *self.build_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock();
        state.builds.push(record);
        state.images.insert(image.to_string());
        Ok(BuildOutput {
            log: format!("Successfully tagged {image}"),
        })
    }

    async fn run(&self, spec: &RunSpec) -> Result<RuntimeHandle, RuntimeError> {
        self.begin(op::RUN, spec.image.as_str())?;
        let mut state = self.state.lock();
        if !state.images.contains(spec.image.as_str()) {
            return Err(RuntimeError::CommandFailed {
                operation: "run",
                exit_code: Some(125),
                stderr: format!("Unable to find image '{}' locally", spec.image),
            });
        }

        state.next_id += 1;
        let id = format!("{:012x}", 0xc0ffee_000000_u64 + state.next_id);
        state.containers.insert(
            id.clone(),
            FakeContainer {
                image: spec.image.to_string(),
                running: true,
                pids: 1,
                environment: spec.environment.clone(),
                limits_memory_mib: spec.limits.memory_mib,
                limits_cpus: spec.limits.cpus,
                logs: Vec::new(),
            },
        );
        Ok(RuntimeHandle::new(id))
    }

    async fn start(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.begin(op::START, handle.as_str())?;
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(handle.as_str())
            .ok_or_else(|| no_such(handle))?;
        container.running = true;
        container.pids = container.pids.max(1);
        Ok(())
    }

    async fn kill(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.begin(op::KILL, handle.as_str())?;
        let mut state = self.state.lock();
        let container = state
            .containers
            .get_mut(handle.as_str())
            .ok_or_else(|| no_such(handle))?;
        if !container.running {
            return Err(RuntimeError::NotRunning(format!(
                "Container {handle} is not running"
            )));
        }
        container.running = false;
        container.pids = 0;
        Ok(())
    }

    async fn remove_container(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.begin(op::RM, handle.as_str())?;
        self.state
            .lock()
            .containers
            .remove(handle.as_str())
            .map(|_| ())
            .ok_or_else(|| no_such(handle))
    }

    async fn remove_image(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        self.begin(op::RMI, image.as_str())?;
        self.state.lock().images.remove(image.as_str());
        Ok(())
    }

    async fn stats(&self, handle: &RuntimeHandle) -> Result<ResourceUsage, RuntimeError> {
        self.begin(op::STATS, handle.as_str())?;
        let delay = *self.stats_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state.lock();
        let container = state
            .containers
            .get(handle.as_str())
            .ok_or_else(|| no_such(handle))?;
        if container.pids == 0 {
            return Ok(ResourceUsage::zero());
        }
        Ok(ResourceUsage {
            cpu_percent: 1.5,
            memory_percent: 2.0,
            memory_usage: format!("10MiB / {}MiB", container.limits_memory_mib),
            block_io: "0B / 0B".to_string(),
            net_io: "1kB / 0B".to_string(),
            pids: container.pids,
        })
    }

    async fn logs(&self, handle: &RuntimeHandle) -> Result<Vec<String>, RuntimeError> {
        self.begin(op::LOGS, handle.as_str())?;
        self.state
            .lock()
            .containers
            .get(handle.as_str())
            .map(|c| c.logs.clone())
            .ok_or_else(|| no_such(handle))
    }

    fn runtime_name(&self) -> &'static str {
        "fake"
    }
}

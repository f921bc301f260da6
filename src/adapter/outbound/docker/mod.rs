//! Docker CLI container runtime.
//!
//! Drives a local Docker (or CLI-compatible) engine by spawning the
//! runtime binary. Each call is bounded by a timeout and the child process
//! is killed when the call is abandoned.

pub mod command;
pub mod parse;

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::domain::{ImageRef, ResourceUsage, RuntimeHandle};
use crate::infrastructure::config::RuntimeConfig;
use crate::port::outbound::runtime::{BuildOutput, ContainerRuntime, RunSpec, RuntimeError};

use command::{exec, CommandOutput};

/// [`ContainerRuntime`] backed by the `docker` command line.
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
    command_timeout: Duration,
    build_timeout: Duration,
}

impl DockerCli {
    #[must_use]
    pub fn new(binary: impl Into<String>, command_timeout: Duration, build_timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            command_timeout,
            build_timeout,
        }
    }

    #[must_use]
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self::new(
            config.binary.clone(),
            config.command_timeout(),
            config.build_timeout(),
        )
    }

    async fn invoke(
        &self,
        operation: &'static str,
        args: Vec<String>,
        workdir: Option<&Path>,
        limit: Duration,
    ) -> Result<CommandOutput, RuntimeError> {
        let output = exec(&self.binary, &args, workdir, limit, operation).await?;
        if output.success {
            Ok(output)
        } else {
            let err = parse::classify_failure(operation, output.exit_code, &output.stderr);
            debug!(operation, error = %err, "Runtime command failed");
            Err(err)
        }
    }

    /// Arguments for `docker run` from a run spec.
    fn run_args(spec: &RunSpec) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "-d".to_string(),
            format!("--memory={}m", spec.limits.memory_mib),
            format!("--cpus={}", spec.limits.cpus),
        ];
        for var in &spec.environment {
            args.push("-e".to_string());
            args.push(var.assignment());
        }
        args.push(spec.image.to_string());
        args
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    #[instrument(skip(self), fields(image = %image))]
    async fn build_image(
        &self,
        context: &Path,
        image: &ImageRef,
    ) -> Result<BuildOutput, RuntimeError> {
        let args = vec![
            "build".to_string(),
            "-t".to_string(),
            image.to_string(),
            ".".to_string(),
        ];
        let output = exec(&self.binary, &args, Some(context), self.build_timeout, "build").await?;
        if output.success {
            Ok(BuildOutput {
                log: output.combined(),
            })
        } else {
            Err(RuntimeError::CommandFailed {
                operation: "build",
                exit_code: output.exit_code,
                stderr: output.combined(),
            })
        }
    }

    async fn run(&self, spec: &RunSpec) -> Result<RuntimeHandle, RuntimeError> {
        let output = self
            .invoke("run", Self::run_args(spec), None, self.command_timeout)
            .await?;
        parse::container_handle(&output.stdout)
    }

    async fn start(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.invoke(
            "start",
            vec!["start".to_string(), handle.to_string()],
            None,
            self.command_timeout,
        )
        .await
        .map(|_| ())
    }

    async fn kill(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.invoke(
            "kill",
            vec!["kill".to_string(), handle.to_string()],
            None,
            self.command_timeout,
        )
        .await
        .map(|_| ())
    }

    async fn remove_container(&self, handle: &RuntimeHandle) -> Result<(), RuntimeError> {
        self.invoke(
            "rm",
            vec!["rm".to_string(), "-f".to_string(), handle.to_string()],
            None,
            self.command_timeout,
        )
        .await
        .map(|_| ())
    }

    async fn remove_image(&self, image: &ImageRef) -> Result<(), RuntimeError> {
        self.invoke(
            "rmi",
            vec!["rmi".to_string(), "-f".to_string(), image.to_string()],
            None,
            self.command_timeout,
        )
        .await
        .map(|_| ())
    }

    async fn stats(&self, handle: &RuntimeHandle) -> Result<ResourceUsage, RuntimeError> {
        let output = self
            .invoke(
                "stats",
                vec![
                    "stats".to_string(),
                    "--no-stream".to_string(),
                    "--format".to_string(),
                    "{{json .}}".to_string(),
                    handle.to_string(),
                ],
                None,
                self.command_timeout,
            )
            .await?;
        parse::stats(&output.stdout)
    }

    async fn logs(&self, handle: &RuntimeHandle) -> Result<Vec<String>, RuntimeError> {
        let output = self
            .invoke(
                "logs",
                vec![
                    "logs".to_string(),
                    "--timestamps".to_string(),
                    handle.to_string(),
                ],
                None,
                self.command_timeout,
            )
            .await?;
        Ok(parse::log_lines(&output.stdout, &output.stderr))
    }

    fn runtime_name(&self) -> &'static str {
        "docker"
    }
}

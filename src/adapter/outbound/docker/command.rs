//! Bounded execution of runtime CLI commands.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tokio::time::timeout;

use crate::port::outbound::runtime::RuntimeError;

/// Captured result of one CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout followed by stderr, for tools that split progress across both.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout.trim_end(), self.stderr),
        }
    }
}

/// Run `program args...` and capture its output.
///
/// The child is killed if `limit` elapses or the returned future is dropped.
///
/// # Errors
/// [`RuntimeError::Spawn`] when the program cannot be launched and
/// [`RuntimeError::Timeout`] when it does not finish in time. A non-zero
/// exit is not an error here; inspect [`CommandOutput::success`].
pub async fn exec(
    program: &str,
    args: &[String],
    workdir: Option<&Path>,
    limit: Duration,
    operation: &'static str,
) -> Result<CommandOutput, RuntimeError> {
    let mut command = Command::new(program);
    command.kill_on_drop(true);
    command.args(args);
    if let Some(dir) = workdir {
        command.current_dir(dir);
    }
    command.stdin(Stdio::null());
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    tracing::trace!(program, ?args, operation, "Running runtime command");

    let output = timeout(limit, command.output())
        .await
        .map_err(|_| RuntimeError::Timeout {
            operation,
            after: limit,
        })?
        .map_err(|e| RuntimeError::Spawn(format!("{program}: {e}")))?;

    Ok(CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

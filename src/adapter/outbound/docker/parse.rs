//! Parsing of Docker CLI output.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::{ResourceUsage, RuntimeHandle};
use crate::port::outbound::runtime::RuntimeError;

/// Length of the short container id Docker prints in listings.
pub const SHORT_ID_LEN: usize = 12;

/// One line of `docker stats --format '{{json .}}'`.
#[derive(Debug, Deserialize)]
struct StatsLine {
    #[serde(rename = "CPUPerc", default)]
    cpu_perc: String,
    #[serde(rename = "MemPerc", default)]
    mem_perc: String,
    #[serde(rename = "MemUsage", default)]
    mem_usage: String,
    #[serde(rename = "BlockIO", default)]
    block_io: String,
    #[serde(rename = "NetIO", default)]
    net_io: String,
    #[serde(rename = "PIDs", default)]
    pids: String,
}

/// Extract the container handle from `docker run -d` output.
///
/// # Errors
/// [`RuntimeError::Parse`] when no id was printed.
pub fn container_handle(stdout: &str) -> Result<RuntimeHandle, RuntimeError> {
    let id = stdout
        .lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .ok_or_else(|| RuntimeError::Parse("runtime printed no container id".to_string()))?;
    let short: String = id.chars().take(SHORT_ID_LEN).collect();
    Ok(RuntimeHandle::new(short))
}

/// Parse `docker stats --no-stream` JSON output into resource usage.
///
/// Unreadable numbers (`--` for a stopped container) read as zero.
///
/// # Errors
/// [`RuntimeError::Parse`] when the output is empty or not JSON.
pub fn stats(stdout: &str) -> Result<ResourceUsage, RuntimeError> {
    let line = stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| RuntimeError::Parse("empty stats output".to_string()))?;
    let raw: StatsLine =
        serde_json::from_str(line).map_err(|e| RuntimeError::Parse(e.to_string()))?;
    let zero = ResourceUsage::zero();

    Ok(ResourceUsage {
        cpu_percent: percent(&raw.cpu_perc),
        memory_percent: percent(&raw.mem_perc),
        memory_usage: non_empty(raw.mem_usage).unwrap_or(zero.memory_usage),
        block_io: non_empty(raw.block_io).unwrap_or(zero.block_io),
        net_io: non_empty(raw.net_io).unwrap_or(zero.net_io),
        pids: raw.pids.trim().parse().unwrap_or(0),
    })
}

fn percent(raw: &str) -> f64 {
    raw.trim().trim_end_matches('%').parse().unwrap_or(0.0)
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == "--" {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Lines of one `docker logs --timestamps` stream with their timestamps.
///
/// A line without a parseable timestamp inherits the previous one.
fn stamped(buffer: &str) -> Vec<(DateTime<Utc>, &str)> {
    let mut last = DateTime::<Utc>::MIN_UTC;
    buffer
        .lines()
        .map(|line| {
            let (stamp, text) = line.split_once(' ').unwrap_or((line, ""));
            match DateTime::parse_from_rfc3339(stamp) {
                Ok(at) => {
                    last = at.with_timezone(&Utc);
                    (last, text)
                }
                Err(_) => (last, line),
            }
        })
        .collect()
}

/// Interleave the stdout and stderr of `docker logs --timestamps` in
/// emission order and strip the timestamps. Stdout wins ties.
#[must_use]
pub fn log_lines(stdout: &str, stderr: &str) -> Vec<String> {
    let out = stamped(stdout);
    let err = stamped(stderr);
    let mut merged = Vec::with_capacity(out.len() + err.len());
    let (mut i, mut j) = (0, 0);

    while i < out.len() || j < err.len() {
        let from_stdout = j == err.len() || (i < out.len() && out[i].0 <= err[j].0);
        if from_stdout {
            merged.push(out[i].1.to_string());
            i += 1;
        } else {
            merged.push(err[j].1.to_string());
            j += 1;
        }
    }
    merged
}

/// Map a failed command to a typed runtime error.
#[must_use]
pub fn classify_failure(
    operation: &'static str,
    exit_code: Option<i32>,
    stderr: &str,
) -> RuntimeError {
    let message = stderr.trim().to_string();
    let lower = message.to_ascii_lowercase();

    if lower.contains("no such container") || lower.contains("no such object") {
        RuntimeError::NoSuchContainer(message)
    } else if lower.contains("is not running") {
        RuntimeError::NotRunning(message)
    } else {
        RuntimeError::CommandFailed {
            operation,
            exit_code,
            stderr: message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_is_truncated_to_short_id() {
        let handle = container_handle(
            "4f1c2e9a7b3d8e6f5a4b3c2d1e0f9a8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d3e2f\n",
        )
        .unwrap();
        assert_eq!(handle.as_str(), "4f1c2e9a7b3d");
    }

    #[test]
    fn handle_skips_pull_progress() {
        let out = "Unable to find image locally\nabc123def4567890\n";
        assert_eq!(container_handle(out).unwrap().as_str(), "abc123def456");
    }

    #[test]
    fn empty_run_output_is_parse_error() {
        assert!(matches!(container_handle("  \n"), Err(RuntimeError::Parse(_))));
    }

    #[test]
    fn parses_running_container_stats() {
        let out = r#"{"BlockIO":"1.2MB / 0B","CPUPerc":"3.25%","Container":"abc","ID":"abc","MemPerc":"2.10%","MemUsage":"10.8MiB / 512MiB","Name":"x","NetIO":"1.1kB / 0B","PIDs":"7"}"#;
        let usage = stats(out).unwrap();
        assert!((usage.cpu_percent - 3.25).abs() < 1e-9);
        assert!((usage.memory_percent - 2.10).abs() < 1e-9);
        assert_eq!(usage.memory_usage, "10.8MiB / 512MiB");
        assert_eq!(usage.block_io, "1.2MB / 0B");
        assert_eq!(usage.net_io, "1.1kB / 0B");
        assert_eq!(usage.pids, 7);
        assert!(usage.has_processes());
    }

    #[test]
    fn stopped_container_reads_as_zero() {
        let out = r#"{"BlockIO":"--","CPUPerc":"--","MemPerc":"--","MemUsage":"--","NetIO":"--","PIDs":"0"}"#;
        let usage = stats(out).unwrap();
        assert_eq!(usage, ResourceUsage::zero());
    }

    #[test]
    fn malformed_stats_is_parse_error() {
        assert!(matches!(stats("not json"), Err(RuntimeError::Parse(_))));
        assert!(matches!(stats(""), Err(RuntimeError::Parse(_))));
    }

    #[test]
    fn classifies_missing_container() {
        let err = classify_failure(
            "kill",
            Some(1),
            "Error response from daemon: No such container: abc123\n",
        );
        assert!(err.is_missing_container());
    }

    #[test]
    fn classifies_not_running() {
        let err = classify_failure(
            "kill",
            Some(1),
            "Error response from daemon: Cannot kill container: abc: Container abc is not running",
        );
        assert!(matches!(err, RuntimeError::NotRunning(_)));
        assert!(err.is_already_stopped());
    }

    #[test]
    fn other_failures_keep_exit_code() {
        let err = classify_failure("build", Some(2), "boom");
        assert_eq!(
            err,
            RuntimeError::CommandFailed {
                operation: "build",
                exit_code: Some(2),
                stderr: "boom".to_string(),
            }
        );
    }

    #[test]
    fn log_lines_interleave_streams_by_timestamp() {
        let stdout = "2026-01-01T00:00:01.000000000Z o1\n2026-01-01T00:00:03.000000000Z o2\n";
        let stderr = "2026-01-01T00:00:02.000000000Z e1\n";
        assert_eq!(log_lines(stdout, stderr), vec!["o1", "e1", "o2"]);
    }

    #[test]
    fn later_stdout_extends_a_mixed_buffer() {
        let stderr = "2026-01-01T00:00:02.000000000Z e1\n";
        let before = log_lines("2026-01-01T00:00:01.000000000Z o1\n", stderr);
        let after = log_lines(
            "2026-01-01T00:00:01.000000000Z o1\n2026-01-01T00:00:04.000000000Z o2\n",
            stderr,
        );
        assert_eq!(before, vec!["o1", "e1"]);
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(after[before.len()..], ["o2".to_string()]);
    }

    #[test]
    fn log_lines_keep_blank_and_unstamped_lines() {
        let stdout = "2026-01-01T00:00:01Z a\n2026-01-01T00:00:01Z \ncontinued\n";
        assert_eq!(log_lines(stdout, ""), vec!["a", "", "continued"]);
    }
}

//! End-to-end tests of the `berth` binary.
//!
//! These never reach a container engine: they stop short of approval, which
//! is the first step that builds an image.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn berth(data_dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("berth").expect("berth binary");
    cmd.current_dir(data_dir)
        .env("BERTH_DATA_DIR", data_dir)
        .env("RUST_LOG", "off");
    cmd
}

fn archive(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("upload.zip");
    std::fs::write(&path, b"PK\x03\x04 not really a zip").expect("write archive");
    path
}

#[test]
fn help_lists_commands() {
    let dir = tempfile::tempdir().unwrap();
    berth(dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("submit"))
        .stdout(predicate::str::contains("decide"))
        .stdout(predicate::str::contains("messages"));
}

#[test]
fn submit_then_reject_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let upload = archive(&dir);

    berth(dir.path())
        .args(["submit", "alice", "bot", "--runtime-version", "20", "-e", "FOO=1", "--json"])
        .arg("--archive")
        .arg(&upload)
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""type":"workload""#))
        .stdout(predicate::str::contains("awaiting_review"))
        .stdout(predicate::str::contains("FOO"));

    berth(dir.path())
        .args(["pending", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""tenant":"alice""#))
        .stdout(predicate::str::contains(r#""name":"bot""#));

    berth(dir.path())
        .args(["stats", "alice", "bot", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("verifying"));

    berth(dir.path())
        .args(["decide", "alice", "bot", "--reject"])
        .assert()
        .success();

    berth(dir.path())
        .args(["list", "alice", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    berth(dir.path())
        .args(["messages", "alice", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected"));

    // The inbox was cleared by the previous read.
    berth(dir.path())
        .args(["messages", "alice", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn start_before_approval_fails() {
    let dir = tempfile::tempdir().unwrap();
    let upload = archive(&dir);

    berth(dir.path())
        .args(["submit", "alice", "bot", "--quiet"])
        .arg("--archive")
        .arg(&upload)
        .assert()
        .success();

    berth(dir.path())
        .args(["start", "alice", "bot"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("has not been built"));
}

#[test]
fn duplicate_submission_fails() {
    let dir = tempfile::tempdir().unwrap();
    let upload = archive(&dir);

    for expect_success in [true, false] {
        let assert = berth(dir.path())
            .args(["submit", "alice", "bot", "--quiet"])
            .arg("--archive")
            .arg(&upload)
            .assert();
        if expect_success {
            assert.success();
        } else {
            assert
                .failure()
                .stderr(predicate::str::contains("already exists"));
        }
    }
}

#[test]
fn unknown_workload_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    berth(dir.path())
        .args(["show", "alice", "ghost", "--json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(r#""type":"error""#))
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn malformed_env_assignment_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let upload = archive(&dir);

    berth(dir.path())
        .args(["submit", "alice", "bot", "-e", "NOEQUALS"])
        .arg("--archive")
        .arg(&upload)
        .assert()
        .failure()
        .stderr(predicate::str::contains("NOEQUALS"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    berth(dir.path())
        .args(["list", "alice", "--config"])
        .arg(dir.path().join("absent.toml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn invalid_config_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("berth.toml"),
        "[runtime]\ncommand_timeout_secs = 0\n",
    )
    .unwrap();

    berth(dir.path())
        .args(["list", "alice"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("command_timeout_secs"));
}

#[test]
fn decide_requires_exactly_one_decision() {
    let dir = tempfile::tempdir().unwrap();
    berth(dir.path())
        .args(["decide", "alice", "bot"])
        .assert()
        .failure()
        .code(2);
}

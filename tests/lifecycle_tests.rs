//! Integration tests for submission, review, and the start/stop/delete
//! lifecycle, run against the in-memory runtime and a real SQLite registry.

mod support;

use std::time::Duration;

use berth::application::Decision;
use berth::domain::{ReviewState, ValidationError};
use berth::error::{BuildStep, Error};
use berth::port::outbound::notifier::Event;
use berth::port::outbound::runtime::RuntimeError;
use berth::testkit::runtime::op;
use support::env::{env_var, TestEnv, ARCHIVE};

fn command_failed(operation: &'static str) -> RuntimeError {
    RuntimeError::CommandFailed {
        operation,
        exit_code: Some(1),
        stderr: "Error response from daemon: engine hiccup".to_string(),
    }
}

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submit_stores_pending_record_and_archive() {
    let env = TestEnv::new();

    let workload = env
        .service
        .submit_workload("alice", "bot", ARCHIVE, Some("20"), vec![env_var("FOO", "1")])
        .await
        .unwrap();

    assert_eq!(workload.state, ReviewState::AwaitingReview);
    assert!(!workload.running);
    assert!(workload.runtime_handle.is_none());
    assert_eq!(workload.runtime_version.as_str(), "20");

    let archive = env.archive_path("alice", "bot");
    assert_eq!(std::fs::read(&archive).unwrap(), ARCHIVE);
    assert_eq!(workload.archive_path.as_deref(), Some(archive.as_path()));

    let pending = env.service.list_pending_reviews().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].to_string(), "alice/bot");
    assert_eq!(env.events.count(|e| matches!(e, Event::Submitted { .. })), 1);
}

#[tokio::test]
async fn submit_without_version_uses_current() {
    let env = TestEnv::new();
    let workload = env.submit("alice", "bot").await;
    assert_eq!(workload.runtime_version.as_str(), "current");
}

#[tokio::test]
async fn submit_rejects_invalid_input_without_storing() {
    let env = TestEnv::new();

    let cases = [
        ("alice", "../escape", ARCHIVE, None),
        ("alice", "a/b", ARCHIVE, None),
        ("alice", "MyBot", ARCHIVE, None),
        ("alice", "bot:latest", ARCHIVE, None),
        ("alice", "-bot", ARCHIVE, None),
        ("9lives", "bot", ARCHIVE, None),
        ("alice", "bot", &b""[..], None),
        ("alice", "bot", ARCHIVE, Some("20; rm -rf /")),
    ];
    for (tenant, name, archive, version) in cases {
        let result = env
            .service
            .submit_workload(tenant, name, archive, version, vec![])
            .await;
        assert!(
            matches!(result, Err(Error::Validation(_))),
            "{tenant}/{name} should be rejected, got {result:?}"
        );
    }

    assert!(env.service.list("alice").await.unwrap().is_empty());
    assert!(!env.config.storage.pending_dir().join("alice").join("bot.zip").exists());
    assert!(env.events.is_empty());
}

#[tokio::test]
async fn submit_duplicate_name_is_rejected() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;

    let result = env
        .service
        .submit_workload("alice", "bot", ARCHIVE, None, vec![])
        .await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::Duplicate { .. }))
    ));

    // Same name under another tenant is independent.
    env.submit("bob", "bot").await;
}

#[tokio::test]
async fn submit_enforces_tenant_quota() {
    let env = TestEnv::with_config(|config| config.limits.max_workloads_per_tenant = 2);
    env.submit("alice", "one").await;
    env.submit("alice", "two").await;

    let result = env
        .service
        .submit_workload("alice", "three", ARCHIVE, None, vec![])
        .await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::QuotaExceeded { limit: 2, .. }))
    ));

    // Other tenants have their own quota.
    env.submit("bob", "one").await;

    // Deleting frees a slot.
    env.service.delete("alice", "one").await.unwrap();
    env.submit("alice", "three").await;
}

#[tokio::test]
async fn submit_rejects_oversized_archive() {
    let env = TestEnv::with_config(|config| config.limits.max_archive_bytes = 8);
    let result = env
        .service
        .submit_workload("alice", "bot", &[0u8; 9], None, vec![])
        .await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::ArchiveTooLarge { size: 9, limit: 8 }))
    ));
}

// ---------------------------------------------------------------------------
// Review
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reject_removes_record_and_archive() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;
    let archive = env.archive_path("alice", "bot");
    assert!(archive.exists());

    let decision = env.service.decide("alice", "bot", false).await.unwrap();
    assert!(matches!(decision, Decision::Rejected { .. }));

    assert!(env.stored("alice", "bot").await.is_none());
    assert!(!archive.exists());
    assert!(env.service.list_pending_reviews().await.unwrap().is_empty());
    assert_eq!(env.runtime.count(op::BUILD), 0);

    let messages = env.service.drain_messages("alice").unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].body.contains("rejected"));
}

#[tokio::test]
async fn reject_for_every_valid_name_leaves_nothing_behind() {
    let env = TestEnv::new();
    for name in ["bot", "bot.zip", "my-app.v2.zip", "a_b", "x1"] {
        env.submit("alice", name).await;
        env.service.decide("alice", name, false).await.unwrap();
        assert!(env.stored("alice", name).await.is_none(), "{name} still stored");
        assert!(!env.archive_path("alice", name).exists(), "{name} archive kept");
    }
}

#[tokio::test]
async fn approve_builds_image_and_marks_built() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;

    let decision = env.service.decide("alice", "bot", true).await.unwrap();
    let Decision::Approved { workload, image } = decision else {
        panic!("expected approval");
    };

    assert_eq!(workload.state, ReviewState::Built);
    assert!(workload.archive_path.is_none());
    assert_eq!(image.as_str(), "alice/bot");
    assert!(env.runtime.has_image("alice/bot"));
    assert!(!env.archive_path("alice", "bot").exists());
    assert!(!env.scratch_path("alice", "bot").exists());
    assert!(env.service.list_pending_reviews().await.unwrap().is_empty());

    let messages = env.service.drain_messages("alice").unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].body.contains("verified"));
    assert!(env.service.drain_messages("alice").unwrap().is_empty());
}

#[tokio::test]
async fn failed_build_leaves_workload_pending_with_archive() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;
    env.runtime.fail_next(op::BUILD, command_failed("build"));

    let result = env.service.decide("alice", "bot", true).await;
    let err = match result {
        Err(Error::Build(err)) => err,
        other => panic!("expected build error, got {other:?}"),
    };
    assert_eq!(err.step, BuildStep::Image);
    assert!(err.diagnostics.contains("engine hiccup"));

    let stored = env.stored("alice", "bot").await.unwrap();
    assert_eq!(stored.state, ReviewState::AwaitingReview);
    assert!(env.archive_path("alice", "bot").exists());
    assert!(!env.scratch_path("alice", "bot").exists());
    assert_eq!(env.events.count(|e| matches!(e, Event::BuildFailed { .. })), 1);

    // The operator can retry once the engine recovers.
    env.service.decide("alice", "bot", true).await.unwrap();
    assert_eq!(env.stored("alice", "bot").await.unwrap().state, ReviewState::Built);
}

#[tokio::test]
async fn approve_outcome_is_built_or_pending_never_both() {
    let env = TestEnv::new();
    for (i, fail) in [false, true, false, true].into_iter().enumerate() {
        let name = format!("w{i}");
        env.service
            .submit_workload("alice", &name, ARCHIVE, None, vec![])
            .await
            .unwrap_or_else(|_| panic!("submit {name}"));
        if fail {
            env.runtime.fail_next(op::BUILD, command_failed("build"));
        }

        let result = env.service.decide("alice", &name, true).await;
        let stored = env.stored("alice", &name).await.unwrap();
        match result {
            Ok(Decision::Approved { image, .. }) => {
                assert_eq!(stored.state, ReviewState::Built);
                assert!(env.runtime.has_image(image.as_str()));
            }
            Err(Error::Build(_)) => {
                assert_eq!(stored.state, ReviewState::AwaitingReview);
                assert!(env.archive_path("alice", &name).exists());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        env.service.delete("alice", &name).await.unwrap();
    }
}

#[tokio::test]
async fn deciding_twice_is_rejected() {
    let env = TestEnv::new();
    env.built("alice", "bot").await;

    let result = env.service.decide("alice", "bot", true).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::NotPending { .. }))
    ));
    let result = env.service.decide("alice", "bot", false).await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::NotPending { .. }))
    ));

    // The second approval never reaches the pipeline.
    assert_eq!(env.runtime.count(op::BUILD), 1);
    assert_eq!(env.events.count(|e| matches!(e, Event::BuildFailed { .. })), 0);
    assert_eq!(env.stored("alice", "bot").await.unwrap().state, ReviewState::Built);
}

#[tokio::test]
async fn decide_unknown_workload_is_not_found() {
    let env = TestEnv::new();
    let result = env.service.decide("alice", "ghost", true).await;
    assert!(matches!(result, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn concurrent_approvals_build_once() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;
    env.runtime.set_build_delay(Duration::from_millis(200));

    let (first, second) = tokio::join!(env.service.decide("alice", "bot", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        env.service.decide("alice", "bot", true).await
    });

    assert!(matches!(first, Ok(Decision::Approved { .. })));
    let err = match second {
        Err(Error::Build(err)) => err,
        other => panic!("second approval should fail, got {other:?}"),
    };
    assert_eq!(err.step, BuildStep::Prepare);
    assert_eq!(env.runtime.count(op::BUILD), 1);
}

#[tokio::test]
async fn reject_during_build_is_refused() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;
    env.runtime.set_build_delay(Duration::from_millis(200));

    let (approve, reject) = tokio::join!(env.service.decide("alice", "bot", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        env.service.decide("alice", "bot", false).await
    });

    assert!(matches!(approve, Ok(Decision::Approved { .. })));
    assert!(matches!(
        reject,
        Err(Error::Validation(ValidationError::BuildInProgress { .. }))
    ));
    assert_eq!(env.stored("alice", "bot").await.unwrap().state, ReviewState::Built);
}

#[tokio::test]
async fn delete_during_build_discards_new_image() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;
    env.runtime.set_build_delay(Duration::from_millis(200));

    let (approve, delete) = tokio::join!(env.service.decide("alice", "bot", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        env.service.delete("alice", "bot").await
    });

    assert!(delete.is_ok());
    assert!(matches!(approve, Err(Error::NotFound { .. })));
    assert!(env.stored("alice", "bot").await.is_none());
    assert!(!env.runtime.has_image("alice/bot"));
}

#[tokio::test]
async fn resubmission_during_build_stays_under_review() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;
    env.runtime.set_build_delay(Duration::from_millis(300));

    let (approve, resubmitted) = tokio::join!(env.service.decide("alice", "bot", true), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        env.service.delete("alice", "bot").await.unwrap();
        env.service
            .submit_workload("alice", "bot", ARCHIVE, Some("18"), vec![])
            .await
            .unwrap()
    });

    assert!(matches!(approve, Err(Error::NotFound { .. })));
    assert!(!env.runtime.has_image("alice/bot"));

    let stored = env.stored("alice", "bot").await.unwrap();
    assert_eq!(stored.state, ReviewState::AwaitingReview);
    assert_eq!(stored.runtime_version.as_str(), "18");
    assert_eq!(stored.created_at, resubmitted.created_at);
    assert!(env.archive_path("alice", "bot").exists());
    assert_eq!(env.service.list_pending_reviews().await.unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Start / stop
// ---------------------------------------------------------------------------

#[tokio::test]
async fn start_requires_built_workload() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;

    let result = env.service.start("alice", "bot").await;
    assert!(matches!(
        result,
        Err(Error::Validation(ValidationError::NotBuilt { .. }))
    ));
    assert_eq!(env.runtime.count(op::RUN), 0);
}

#[tokio::test]
async fn first_start_creates_container_with_limits() {
    let env = TestEnv::new();
    env.built("alice", "bot").await;

    let workload = env.service.start("alice", "bot").await.unwrap();
    let handle = workload.runtime_handle.clone().expect("handle recorded");
    assert!(!handle.as_str().is_empty());
    assert!(workload.running);

    let container = env.runtime.container(&handle).unwrap();
    assert_eq!(container.image, "alice/bot");
    assert_eq!(container.limits_memory_mib, 512);
    assert!((container.limits_cpus - 0.25).abs() < f64::EPSILON);

    let stored = env.stored("alice", "bot").await.unwrap();
    assert_eq!(stored.runtime_handle, Some(handle));
    assert!(stored.running);
}

#[tokio::test]
async fn start_is_idempotent_on_handle() {
    let env = TestEnv::new();
    env.built("alice", "bot").await;

    let first = env.service.start("alice", "bot").await.unwrap();
    let second = env.service.start("alice", "bot").await.unwrap();

    assert_eq!(first.runtime_handle, second.runtime_handle);
    assert!(second.running);
    assert_eq!(env.runtime.count(op::RUN), 1);
    assert_eq!(env.runtime.count(op::START), 1);
    assert_eq!(env.runtime.container_count(), 1);
}

#[tokio::test]
async fn restart_after_stop_reuses_container() {
    let env = TestEnv::new();
    let running = env.running("alice", "bot").await;

    env.service.stop("alice", "bot").await.unwrap();
    let restarted = env.service.start("alice", "bot").await.unwrap();

    assert_eq!(restarted.runtime_handle, running.runtime_handle);
    assert!(restarted.running);
    assert_eq!(env.runtime.count(op::RUN), 1);
}

#[tokio::test]
async fn start_recreates_vanished_container() {
    let env = TestEnv::new();
    let running = env.running("alice", "bot").await;
    let old = running.runtime_handle.unwrap();
    env.runtime.vanish(&old);

    let restarted = env.service.start("alice", "bot").await.unwrap();
    let new = restarted.runtime_handle.unwrap();

    assert_ne!(new, old);
    assert!(restarted.running);
    assert_eq!(env.runtime.count(op::RUN), 2);
}

#[tokio::test]
async fn failed_run_leaves_registry_unchanged() {
    let env = TestEnv::new();
    let built = env.built("alice", "bot").await;
    env.runtime.fail_next(op::RUN, command_failed("run"));

    let result = env.service.start("alice", "bot").await;
    assert!(matches!(result, Err(Error::RuntimeUnavailable(_))));
    assert_eq!(env.stored("alice", "bot").await.unwrap(), built);
}

#[tokio::test]
async fn stop_twice_never_errors() {
    let env = TestEnv::new();
    env.running("alice", "bot").await;

    let first = env.service.stop("alice", "bot").await.unwrap();
    let second = env.service.stop("alice", "bot").await.unwrap();

    assert!(!first.running);
    assert!(!second.running);
    assert!(first.runtime_handle.is_some());
}

#[tokio::test]
async fn stop_without_container_makes_no_runtime_call() {
    let env = TestEnv::new();
    env.built("alice", "bot").await;

    let stopped = env.service.stop("alice", "bot").await.unwrap();
    assert!(!stopped.running);
    assert_eq!(env.runtime.count(op::KILL), 0);
}

#[tokio::test]
async fn stop_of_vanished_container_clears_handle() {
    let env = TestEnv::new();
    let running = env.running("alice", "bot").await;
    env.runtime.vanish(running.runtime_handle.as_ref().unwrap());

    let stopped = env.service.stop("alice", "bot").await.unwrap();
    assert!(!stopped.running);
    assert!(stopped.runtime_handle.is_none());
}

#[tokio::test]
async fn stop_persists_flag_even_when_kill_fails() {
    let env = TestEnv::new();
    env.running("alice", "bot").await;
    env.runtime.fail_next(op::KILL, command_failed("kill"));

    let result = env.service.stop("alice", "bot").await;
    assert!(matches!(result, Err(Error::RuntimeUnavailable(_))));
    assert!(!env.stored("alice", "bot").await.unwrap().running);
    assert_eq!(env.events.count(|e| matches!(e, Event::Stopped { .. })), 1);
}

// ---------------------------------------------------------------------------
// Delete
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_removes_container_image_and_record() {
    let env = TestEnv::new();
    let running = env.running("alice", "bot").await;
    let handle = running.runtime_handle.unwrap();

    let removed = env.service.delete("alice", "bot").await.unwrap();
    assert_eq!(removed.runtime_handle.as_ref(), Some(&handle));

    assert!(env.runtime.container(&handle).is_none());
    assert!(!env.runtime.has_image("alice/bot"));
    assert!(matches!(
        env.service.get("alice", "bot").await,
        Err(Error::NotFound { .. })
    ));
    assert_eq!(env.events.count(|e| matches!(e, Event::Deleted { .. })), 1);
}

#[tokio::test]
async fn delete_is_terminal_even_when_runtime_fails() {
    let env = TestEnv::new();
    env.running("alice", "bot").await;
    env.runtime.fail_next(op::KILL, command_failed("kill"));
    env.runtime.fail_next(op::RM, command_failed("rm"));
    env.runtime.fail_next(op::RMI, command_failed("rmi"));

    env.service.delete("alice", "bot").await.unwrap();

    assert!(matches!(
        env.service.get("alice", "bot").await,
        Err(Error::NotFound { .. })
    ));
    assert!(env.service.list("alice").await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_pending_workload_removes_archive() {
    let env = TestEnv::new();
    env.submit("alice", "bot").await;

    env.service.delete("alice", "bot").await.unwrap();

    assert!(!env.archive_path("alice", "bot").exists());
    assert!(env.service.list_pending_reviews().await.unwrap().is_empty());
}

#[tokio::test]
async fn operations_on_unknown_workload_are_not_found() {
    let env = TestEnv::new();
    assert!(matches!(
        env.service.start("alice", "ghost").await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        env.service.stop("alice", "ghost").await,
        Err(Error::NotFound { .. })
    ));
    assert!(matches!(
        env.service.delete("alice", "ghost").await,
        Err(Error::NotFound { .. })
    ));
}

#[tokio::test]
async fn list_is_scoped_to_tenant_and_sorted() {
    let env = TestEnv::new();
    env.submit("alice", "zeta").await;
    env.submit("alice", "alpha").await;
    env.submit("bob", "mid").await;

    let names: Vec<String> = env
        .service
        .list("alice")
        .await
        .unwrap()
        .into_iter()
        .map(|w| w.name.to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "zeta"]);
}

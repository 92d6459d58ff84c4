// tests/interactive_session.rs

use std::time::Duration;

use tokio::io::{duplex, AsyncWriteExt, BufReader};

use taskpulse::engine::{ProgressSettings, RuntimeOptions};
use taskpulse::errors::{StoreError, TaskpulseError};
use taskpulse::fs::mock::MockFileSystem;
use taskpulse::interactive_session;
use taskpulse::runner::RunnerRegistry;
use taskpulse_test_utils::fake_runner::{FakeBehaviour, FakeRunner};
use taskpulse_test_utils::{harness, init_tracing, with_timeout, Harness};

fn registry() -> RunnerRegistry {
    RunnerRegistry::new().with_runner(Box::new(
        FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(50))),
    ))
}

#[tokio::test(start_paused = true)]
async fn store_failure_ends_the_session_without_more_input() {
    init_tracing();

    let fs = MockFileSystem::new();
    fs.set_fail_writes(true);
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(registry(), fs, ProgressSettings::default(), RuntimeOptions::default());
    let orchestrator = tokio::spawn(orchestrator.run());

    // The writer half stays open: the session must not wait for a next line.
    let (mut writer, reader) = duplex(64);
    writer.write_all(b"NPM build\n").await.unwrap();

    let err = with_timeout(interactive_session(&handle, orchestrator, BufReader::new(reader)))
        .await
        .expect_err("a failed store write must end the session");

    match err.downcast_ref::<TaskpulseError>() {
        Some(TaskpulseError::Store(StoreError::Write { .. })) => {}
        other => panic!("expected a store write error, got {other:?} ({err:#})"),
    }
    assert!(presenter.outcomes().is_empty());
    drop(writer);
}

#[tokio::test(start_paused = true)]
async fn shutdown_ends_the_session_without_more_input() {
    init_tracing();

    let Harness {
        orchestrator,
        handle,
        ..
    } = harness(
        registry(),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );
    let orchestrator = tokio::spawn(orchestrator.run());

    let (writer, reader) = duplex(64);
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            let _ = handle.shutdown().await;
        });
    }

    let report = with_timeout(interactive_session(&handle, orchestrator, BufReader::new(reader)))
        .await
        .unwrap();
    assert_eq!(report.completed_runs, 0);
    drop(writer);
}

#[tokio::test(start_paused = true)]
async fn quit_line_ends_the_session() {
    init_tracing();

    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(
        registry(),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );
    let orchestrator = tokio::spawn(orchestrator.run());

    let (mut writer, reader) = duplex(64);
    writer.write_all(b"NPM build\n").await.unwrap();
    let feeder = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        writer.write_all(b"quit\n").await.unwrap();
        writer
    });

    let report = with_timeout(interactive_session(&handle, orchestrator, BufReader::new(reader)))
        .await
        .unwrap();
    assert_eq!(report.completed_runs, 1);
    assert_eq!(presenter.outcomes(), vec![true]);
    drop(feeder.await.unwrap());
}

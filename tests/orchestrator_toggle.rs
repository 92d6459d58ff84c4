// tests/orchestrator_toggle.rs

use std::error::Error;
use std::time::Duration;

use taskpulse::engine::{ProgressSettings, RunStatus, RuntimeOptions};
use taskpulse::fs::mock::MockFileSystem;
use taskpulse::runner::RunnerRegistry;
use taskpulse::types::Progress;
use taskpulse_test_utils::fake_runner::{FakeBehaviour, FakeRunner};
use taskpulse_test_utils::{harness, init_tracing, with_timeout, Harness, TEST_PROJECT_KEY};

type TestResult = Result<(), Box<dyn Error>>;

fn registry_of(runners: Vec<FakeRunner>) -> RunnerRegistry {
    runners
        .into_iter()
        .fold(RunnerRegistry::new(), |reg, r| reg.with_runner(Box::new(r)))
}

#[tokio::test(start_paused = true)]
async fn other_task_is_ignored_while_one_runs() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM")
        .task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(200)))
        .task("test", FakeBehaviour::SucceedAfter(Duration::from_millis(10)));
    let log = runner.log();
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions { exit_when_idle: true },
    );

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "build").await?;
    handle.run_task("NPM", "test").await?;

    let report = with_timeout(join).await??;
    assert_eq!(report.completed_runs, 1);
    assert_eq!(log.lock().unwrap().starts, vec!["build".to_string()]);
    assert_eq!(presenter.started().len(), 1);
    assert_eq!(presenter.started()[0].0.task, "build");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn repeated_kill_requests_kill_once() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("serve", FakeBehaviour::RunUntilKilled);
    let log = runner.log();
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions { exit_when_idle: true },
    );

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "serve").await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.run_task("NPM", "serve").await?;
    handle.run_task("NPM", "serve").await?;

    with_timeout(join).await??;
    assert_eq!(log.lock().unwrap().kills, 1);
    assert_eq!(log.lock().unwrap().starts.len(), 1);
    assert_eq!(presenter.outcomes(), vec![false]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn killed_run_fails_even_if_runner_reports_success() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("serve", FakeBehaviour::SucceedWhenKilled);
    let Harness {
        orchestrator,
        handle,
        presenter,
        fs,
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions { exit_when_idle: true },
    );

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "serve").await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    handle.run_task("NPM", "serve").await?;

    let report = with_timeout(join).await??;
    assert_eq!(report.last_outcome, Some(false));
    assert_eq!(presenter.outcomes(), vec![false]);
    assert_eq!(fs.write_count(), 0, "a killed run must not record a duration");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn status_tracks_the_run_lifecycle() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::RunUntilKilled);
    let Harness {
        orchestrator,
        handle,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );

    let join = tokio::spawn(orchestrator.run());
    assert_eq!(handle.status().await?, RunStatus::Idle);

    handle.run_task("NPM", "build").await?;
    tokio::time::sleep(Duration::from_millis(95)).await;

    match handle.status().await? {
        RunStatus::Running {
            identity,
            indeterminate,
            killed,
            progress,
        } => {
            assert_eq!(identity.project, TEST_PROJECT_KEY);
            assert_eq!(identity.runner, "NPM");
            assert_eq!(identity.task, "build");
            assert!(indeterminate);
            assert!(!killed);
            assert!(matches!(progress, Some(Progress::Frame(_))));
        }
        other => panic!("expected a running task, got {other:?}"),
    }

    handle.run_task("NPM", "build").await?;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(handle.status().await?, RunStatus::Idle);

    handle.shutdown().await?;
    let report = with_timeout(join).await??;
    assert_eq!(report.completed_runs, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_runner_is_ignored() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(10)));
    let log = runner.log();
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("Gulp", "build").await?;
    assert_eq!(handle.status().await?, RunStatus::Idle);

    handle.shutdown().await?;
    let report = with_timeout(join).await??;
    assert_eq!(report.completed_runs, 0);
    assert!(presenter.events().is_empty());
    assert!(log.lock().unwrap().starts.is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn unknown_task_of_known_runner_fails() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(10)));
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions { exit_when_idle: true },
    );

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "deploy").await?;

    let report = with_timeout(join).await??;
    assert_eq!(report.last_outcome, Some(false));
    assert_eq!(presenter.outcomes(), vec![false]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn watchdog_abandons_a_silent_runner() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("hang", FakeBehaviour::NeverFinish);
    let log = runner.log();
    let settings = ProgressSettings {
        watchdog: Some(Duration::from_millis(500)),
        ..ProgressSettings::default()
    };
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        settings,
        RuntimeOptions { exit_when_idle: true },
    );

    let started = tokio::time::Instant::now();
    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "hang").await?;

    let report = with_timeout(join).await??;
    assert_eq!(report.last_outcome, Some(false));
    assert!(started.elapsed() >= Duration::from_millis(500));
    assert_eq!(presenter.outcomes(), vec![false]);
    assert_eq!(log.lock().unwrap().kills, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn task_listing_omits_runners_without_tasks() -> TestResult {
    init_tracing();

    let npm = FakeRunner::new("NPM")
        .task("build", FakeBehaviour::RunUntilKilled)
        .task("test", FakeBehaviour::RunUntilKilled);
    let grunt = FakeRunner::new("Grunt");
    let Harness {
        orchestrator,
        handle,
        ..
    } = harness(
        registry_of(vec![npm, grunt]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );

    let join = tokio::spawn(orchestrator.run());
    let listing = handle.tasks().await?;
    assert_eq!(listing.len(), 1);
    assert_eq!(
        listing.get("NPM"),
        Some(&vec!["build".to_string(), "test".to_string()])
    );

    handle.shutdown().await?;
    with_timeout(join).await??;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn shutdown_kills_the_running_task() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("serve", FakeBehaviour::RunUntilKilled);
    let log = runner.log();
    let Harness {
        orchestrator,
        handle,
        ..
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "serve").await?;
    tokio::time::sleep(Duration::from_millis(40)).await;
    handle.shutdown().await?;

    let report = with_timeout(join).await??;
    assert_eq!(report.completed_runs, 0);
    assert_eq!(log.lock().unwrap().kills, 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn runs_can_follow_one_another() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(200)));
    let Harness {
        orchestrator,
        handle,
        presenter,
        fs,
    } = harness(
        registry_of(vec![runner]),
        MockFileSystem::new(),
        ProgressSettings::default(),
        RuntimeOptions::default(),
    );

    let join = tokio::spawn(orchestrator.run());

    handle.run_task("NPM", "build").await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(handle.status().await?, RunStatus::Idle);

    // The second run uses the estimate recorded by the first.
    handle.run_task("NPM", "build").await?;
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(handle.status().await?, RunStatus::Idle);

    handle.shutdown().await?;
    let report = with_timeout(join).await??;
    assert_eq!(report.completed_runs, 2);

    let started = presenter.started();
    assert_eq!(started.len(), 2);
    assert!(started[0].1);
    assert!(!started[1].1);
    assert_eq!(presenter.outcomes(), vec![true, true]);
    assert_eq!(fs.write_count(), 2);
    Ok(())
}

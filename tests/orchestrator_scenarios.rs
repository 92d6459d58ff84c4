// tests/orchestrator_scenarios.rs

use std::error::Error;
use std::time::Duration;

use taskpulse::engine::{ProgressSettings, RunReport, RuntimeOptions};
use taskpulse::errors::{StoreError, TaskpulseError};
use taskpulse::fs::mock::MockFileSystem;
use taskpulse::runner::RunnerRegistry;
use taskpulse_test_utils::fake_runner::{FakeBehaviour, FakeRunner};
use taskpulse_test_utils::{
    harness, init_tracing, memory_store, with_timeout, Harness, TEST_PROJECT_KEY, TEST_STORE_PATH,
};

type TestResult = Result<(), Box<dyn Error>>;

fn exit_when_idle() -> RuntimeOptions {
    RuntimeOptions {
        exit_when_idle: true,
    }
}

fn seeded_fs(runner: &str, task: &str, millis: u64) -> MockFileSystem {
    let fs = MockFileSystem::new();
    fs.add_file(
        TEST_STORE_PATH,
        format!(r#"{{"{TEST_PROJECT_KEY}": {{"{runner}": {{"{task}": {millis}}}}}}}"#),
    );
    fs
}

fn stored(fs: &MockFileSystem, runner: &str, task: &str) -> Option<u64> {
    memory_store(fs).get_duration(TEST_PROJECT_KEY, runner, task)
}

async fn run_single(h: Harness, runner: &str, task: &str) -> Result<RunReport, Box<dyn Error>> {
    let Harness {
        orchestrator,
        handle,
        ..
    } = h;
    let join = tokio::spawn(orchestrator.run());
    handle.run_task(runner, task).await?;
    let report = with_timeout(join).await??;
    Ok(report)
}

#[tokio::test(start_paused = true)]
async fn first_run_is_indeterminate_and_records_duration() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(100)));
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let h = harness(registry, MockFileSystem::new(), ProgressSettings::default(), exit_when_idle());
    let presenter = h.presenter.clone();
    let fs = h.fs.clone();

    let report = run_single(h, "NPM", "build").await?;

    assert_eq!(report.completed_runs, 1);
    assert_eq!(report.last_outcome, Some(true));

    let started = presenter.started();
    assert_eq!(started.len(), 1);
    assert!(started[0].1, "no estimate on record means indeterminate mode");

    let frames = presenter.frames();
    assert!(frames.len() >= 3, "expected a few spinner frames, got {frames:?}");
    assert_eq!(&frames[..3], &[1, 2, 3]);
    assert!(presenter.percents().is_empty());
    assert_eq!(presenter.outcomes(), vec![true]);

    let recorded = stored(&fs, "NPM", "build").expect("duration recorded");
    assert!((100..=110).contains(&recorded), "recorded {recorded}ms");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn early_finish_fast_forwards_to_full() -> TestResult {
    init_tracing();

    let fs = seeded_fs("NPM", "build", 2000);
    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(1000)));
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let h = harness(registry, fs.clone(), ProgressSettings::default(), exit_when_idle());
    let presenter = h.presenter.clone();

    let report = run_single(h, "NPM", "build").await?;
    assert_eq!(report.last_outcome, Some(true));

    let started = presenter.started();
    assert!(!started[0].1, "an estimate on record means known-duration mode");

    let percents = presenter.percents();
    assert_eq!(percents.first(), Some(&0));
    assert!(
        percents.windows(2).all(|w| w[0] <= w[1]),
        "progress must never go backwards: {percents:?}"
    );

    // Half of the estimate had elapsed, so the animation covers 51..=100.
    let tail: Vec<u8> = (51..=100).collect();
    assert!(percents.len() > tail.len());
    assert_eq!(&percents[percents.len() - tail.len()..], tail.as_slice());
    assert_eq!(percents.iter().filter(|p| **p == 100).count(), 1);

    assert_eq!(presenter.outcomes(), vec![true]);

    let recorded = stored(&fs, "NPM", "build").expect("duration recorded");
    assert!((1000..=1010).contains(&recorded), "recorded {recorded}ms");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn overrun_holds_at_99_and_finishes_without_animation() -> TestResult {
    init_tracing();

    let fs = seeded_fs("NPM", "build", 1000);
    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(3000)));
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let h = harness(registry, fs.clone(), ProgressSettings::default(), exit_when_idle());
    let presenter = h.presenter.clone();

    let report = run_single(h, "NPM", "build").await?;
    assert_eq!(report.last_outcome, Some(true));

    let percents = presenter.percents();
    assert!(percents.iter().all(|p| *p <= 99), "never 100 while running: {percents:?}");
    assert_eq!(percents.last(), Some(&99));
    assert!(percents.iter().filter(|p| **p == 99).count() > 1);
    assert_eq!(presenter.outcomes(), vec![true]);

    let recorded = stored(&fs, "NPM", "build").expect("duration recorded");
    assert!((3000..=3010).contains(&recorded), "recorded {recorded}ms");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn second_request_kills_and_reports_failure() -> TestResult {
    init_tracing();

    let fs = seeded_fs("NPM", "build", 1000);
    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::RunUntilKilled);
    let log = runner.log();
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(registry, fs.clone(), ProgressSettings::default(), exit_when_idle());

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "build").await?;
    tokio::time::sleep(Duration::from_millis(300)).await;
    handle.run_task("NPM", "build").await?;

    let report = with_timeout(join).await??;
    assert_eq!(report.last_outcome, Some(false));

    assert_eq!(presenter.outcomes(), vec![false]);
    assert!(!presenter.percents().contains(&100));
    assert_eq!(log.lock().unwrap().kills, 1);

    // A killed run leaves the estimate alone.
    assert_eq!(stored(&fs, "NPM", "build"), Some(1000));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_run_does_not_touch_the_store() -> TestResult {
    init_tracing();

    let fs = seeded_fs("NPM", "lint", 400);
    let runner = FakeRunner::new("NPM").task("lint", FakeBehaviour::FailAfter(Duration::from_millis(100)));
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let h = harness(registry, fs.clone(), ProgressSettings::default(), exit_when_idle());
    let presenter = h.presenter.clone();

    let report = run_single(h, "NPM", "lint").await?;
    assert_eq!(report.last_outcome, Some(false));

    // Failures still animate to 100 before the terminal notification.
    assert_eq!(presenter.percents().last(), Some(&100));
    assert_eq!(presenter.outcomes(), vec![false]);
    assert_eq!(stored(&fs, "NPM", "lint"), Some(400));
    assert_eq!(fs.write_count(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn runner_output_reaches_presenter_before_finish() -> TestResult {
    init_tracing();

    let runner = FakeRunner::new("NPM")
        .task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(50)))
        .with_output(&["compiling", "done"]);
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let h = harness(registry, MockFileSystem::new(), ProgressSettings::default(), exit_when_idle());
    let presenter = h.presenter.clone();

    run_single(h, "NPM", "build").await?;

    assert_eq!(presenter.output(), vec!["compiling".to_string(), "done".to_string()]);

    let events = presenter.events();
    assert!(matches!(
        events.first(),
        Some(taskpulse::present::PresentationEvent::Started { .. })
    ));
    assert!(matches!(
        events.last(),
        Some(taskpulse::present::PresentationEvent::Finished { success: true })
    ));
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn store_write_failure_stops_the_orchestrator() -> TestResult {
    init_tracing();

    let fs = seeded_fs("NPM", "build", 2000);
    fs.set_fail_writes(true);
    let runner = FakeRunner::new("NPM").task("build", FakeBehaviour::SucceedAfter(Duration::from_millis(100)));
    let registry = RunnerRegistry::new().with_runner(Box::new(runner));
    let Harness {
        orchestrator,
        handle,
        presenter,
        ..
    } = harness(registry, fs.clone(), ProgressSettings::default(), RuntimeOptions::default());

    let join = tokio::spawn(orchestrator.run());
    handle.run_task("NPM", "build").await?;

    match with_timeout(join).await? {
        Err(TaskpulseError::Store(StoreError::Write { path, .. })) => {
            assert_eq!(path.to_str(), Some(TEST_STORE_PATH));
        }
        other => panic!("expected a fatal store write error, got {other:?}"),
    }

    assert!(presenter.outcomes().is_empty(), "no terminal notification after a fatal error");
    assert_eq!(stored(&fs, "NPM", "build"), Some(2000));
    Ok(())
}

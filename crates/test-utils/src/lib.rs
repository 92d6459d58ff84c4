pub mod builders;
pub mod fake_runner;
pub mod recording;

use std::path::PathBuf;
use std::sync::{Arc, Once};

use tracing_subscriber::{fmt, EnvFilter};

use taskpulse::engine::{Orchestrator, OrchestratorHandle, ProgressSettings, RuntimeOptions};
use taskpulse::fs::mock::MockFileSystem;
use taskpulse::runner::RunnerRegistry;
use taskpulse::store::DurationStore;
use taskpulse::types::ProjectContext;

use crate::recording::RecordingPresenter;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

pub const TEST_PROJECT_KEY: &str = "demo";
pub const TEST_STORE_PATH: &str = "/store/durations.json";

pub fn test_project() -> ProjectContext {
    ProjectContext::new(PathBuf::from("/projects/demo"), Some(TEST_PROJECT_KEY.to_string()))
}

/// A duration store backed by an in-memory filesystem.
pub fn memory_store(fs: &MockFileSystem) -> DurationStore {
    DurationStore::open(Arc::new(fs.clone()), TEST_STORE_PATH).expect("opening memory store")
}

/// Everything a test needs to drive an orchestrator and inspect the results.
pub struct Harness {
    pub orchestrator: Orchestrator<RecordingPresenter>,
    pub handle: OrchestratorHandle,
    pub presenter: RecordingPresenter,
    pub fs: MockFileSystem,
}

/// Orchestrator over the given runners, an in-memory store pre-seeded from
/// `fs`, and a recording presenter.
pub fn harness(
    registry: RunnerRegistry,
    fs: MockFileSystem,
    settings: ProgressSettings,
    options: RuntimeOptions,
) -> Harness {
    let presenter = RecordingPresenter::new();
    let store = memory_store(&fs);
    let (orchestrator, handle) = Orchestrator::new(
        test_project(),
        registry,
        store,
        presenter.clone(),
        settings,
        options,
    );
    Harness {
        orchestrator,
        handle,
        presenter,
        fs,
    }
}

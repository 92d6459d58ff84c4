use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::sleep;

use taskpulse::runner::{TaskReporter, TaskRunner};

/// How a fake task behaves once started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakeBehaviour {
    /// Report success after the delay, or failure if killed first.
    SucceedAfter(Duration),
    /// Report failure after the delay, or if killed first.
    FailAfter(Duration),
    /// Run until killed, then report failure.
    RunUntilKilled,
    /// Run until killed, then (wrongly) report success.
    SucceedWhenKilled,
    /// Hold the reporter forever without reporting.
    NeverFinish,
}

/// What the orchestrator asked the fake runner to do.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FakeRunnerLog {
    pub starts: Vec<String>,
    pub kills: usize,
}

/// Scripted in-memory runner.
///
/// Each start spawns a Tokio task that plays the scripted behaviour and then
/// consumes the reporter. With a paused test clock the delays are virtual.
#[derive(Debug)]
pub struct FakeRunner {
    name: String,
    tasks: Vec<(String, FakeBehaviour)>,
    output: Vec<String>,
    log: Arc<Mutex<FakeRunnerLog>>,
    kill_tx: Option<oneshot::Sender<()>>,
}

impl FakeRunner {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tasks: Vec::new(),
            output: Vec::new(),
            log: Arc::new(Mutex::new(FakeRunnerLog::default())),
            kill_tx: None,
        }
    }

    pub fn task(mut self, name: impl Into<String>, behaviour: FakeBehaviour) -> Self {
        self.tasks.push((name.into(), behaviour));
        self
    }

    /// Lines emitted on every start, before the behaviour plays.
    pub fn with_output(mut self, lines: &[&str]) -> Self {
        self.output = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    /// Shared view of the start/kill log; grab it before boxing the runner.
    pub fn log(&self) -> Arc<Mutex<FakeRunnerLog>> {
        self.log.clone()
    }

    fn behaviour(&self, task: &str) -> Option<FakeBehaviour> {
        self.tasks
            .iter()
            .find(|(name, _)| name == task)
            .map(|(_, b)| *b)
    }
}

impl TaskRunner for FakeRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tasks(&self, _project_dir: &Path) -> Vec<String> {
        self.tasks.iter().map(|(name, _)| name.clone()).collect()
    }

    fn start(&mut self, task: &str, _project_dir: &Path, reporter: TaskReporter) {
        self.log.lock().unwrap().starts.push(task.to_string());

        let Some(behaviour) = self.behaviour(task) else {
            reporter.finish_detached(false);
            return;
        };

        let (kill_tx, mut kill_rx) = oneshot::channel::<()>();
        self.kill_tx = Some(kill_tx);
        let output = self.output.clone();

        tokio::spawn(async move {
            for line in output {
                reporter.output_line(line).await;
            }

            match behaviour {
                FakeBehaviour::SucceedAfter(delay) | FakeBehaviour::FailAfter(delay) => {
                    let success = matches!(behaviour, FakeBehaviour::SucceedAfter(_));
                    tokio::select! {
                        _ = sleep(delay) => reporter.finish(success).await,
                        Ok(()) = &mut kill_rx => reporter.finish(false).await,
                    }
                }
                FakeBehaviour::RunUntilKilled => {
                    let _ = kill_rx.await;
                    reporter.finish(false).await;
                }
                FakeBehaviour::SucceedWhenKilled => {
                    let _ = kill_rx.await;
                    reporter.finish(true).await;
                }
                FakeBehaviour::NeverFinish => {
                    let _held = reporter;
                    std::future::pending::<()>().await;
                }
            }
        });
    }

    fn kill(&mut self) {
        self.log.lock().unwrap().kills += 1;
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }
}

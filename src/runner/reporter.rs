// src/runner/reporter.rs

//! The channel a runner uses to talk back to the orchestrator.

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::engine::{OrchestratorEvent, RunId};

/// Cloneable sender for output lines of one run.
#[derive(Debug, Clone)]
pub struct OutputSink {
    run_id: RunId,
    tx: mpsc::Sender<OrchestratorEvent>,
}

impl OutputSink {
    /// Forward one line. Returns `false` once the orchestrator is gone.
    pub async fn line(&self, line: impl Into<String>) -> bool {
        self.tx
            .send(OrchestratorEvent::OutputLine {
                run_id: self.run_id,
                line: line.into(),
            })
            .await
            .is_ok()
    }
}

/// Handed to [`TaskRunner::start`](super::TaskRunner::start) for exactly one
/// run.
///
/// [`finish`](Self::finish) consumes the reporter, so a runner cannot report
/// a terminal outcome twice. A reporter dropped without finishing reports
/// failure on its own.
#[derive(Debug)]
pub struct TaskReporter {
    run_id: RunId,
    tx: mpsc::Sender<OrchestratorEvent>,
    finished: bool,
}

impl TaskReporter {
    pub fn new(run_id: RunId, tx: mpsc::Sender<OrchestratorEvent>) -> Self {
        Self {
            run_id,
            tx,
            finished: false,
        }
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    pub fn output_sink(&self) -> OutputSink {
        OutputSink {
            run_id: self.run_id,
            tx: self.tx.clone(),
        }
    }

    pub async fn output_line(&self, line: impl Into<String>) -> bool {
        self.output_sink().line(line).await
    }

    /// Deliver the terminal callback.
    pub async fn finish(mut self, success: bool) {
        self.finished = true;
        let event = OrchestratorEvent::RunnerFinished {
            run_id: self.run_id,
            success,
        };
        if self.tx.send(event).await.is_err() {
            debug!(run_id = self.run_id, "orchestrator gone before terminal callback");
        }
    }

    /// Deliver the terminal callback from synchronous code.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn finish_detached(self, success: bool) {
        tokio::spawn(self.finish(success));
    }
}

impl Drop for TaskReporter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        warn!(
            run_id = self.run_id,
            "runner dropped its reporter without finishing; reporting failure"
        );
        let event = OrchestratorEvent::RunnerFinished {
            run_id: self.run_id,
            success: false,
        };
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let tx = self.tx.clone();
                    handle.spawn(async move {
                        let _ = tx.send(event).await;
                    });
                }
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

// src/engine/handle.rs

use tokio::sync::{mpsc, oneshot};

use crate::engine::{OrchestratorEvent, RunStatus, TaskListing};
use crate::errors::{Result, TaskpulseError};

/// Cloneable inbound interface of a running [`Orchestrator`](super::Orchestrator).
#[derive(Debug, Clone)]
pub struct OrchestratorHandle {
    tx: mpsc::Sender<OrchestratorEvent>,
}

impl OrchestratorHandle {
    pub(crate) fn new(tx: mpsc::Sender<OrchestratorEvent>) -> Self {
        Self { tx }
    }

    /// Start the task when idle; kill it when it is the task running.
    /// Ignored while any other task runs.
    pub async fn run_task(&self, runner: impl Into<String>, task: impl Into<String>) -> Result<()> {
        self.send(OrchestratorEvent::RunRequested {
            runner: runner.into(),
            task: task.into(),
        })
        .await
    }

    /// Tasks of all runners, omitting runners without tasks.
    pub async fn tasks(&self) -> Result<TaskListing> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorEvent::ListTasks { reply }).await?;
        rx.await.map_err(|_| TaskpulseError::OrchestratorGone)
    }

    pub async fn status(&self) -> Result<RunStatus> {
        let (reply, rx) = oneshot::channel();
        self.send(OrchestratorEvent::QueryStatus { reply }).await?;
        rx.await.map_err(|_| TaskpulseError::OrchestratorGone)
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(OrchestratorEvent::ShutdownRequested).await
    }

    async fn send(&self, event: OrchestratorEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| TaskpulseError::OrchestratorGone)
    }
}

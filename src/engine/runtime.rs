// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::engine::core::{CoreEvent, CoreOrchestrator};
use crate::engine::handle::OrchestratorHandle;
use crate::engine::progress::ProgressSettings;
use crate::engine::{CoreCommand, OrchestratorEvent, RunId, RuntimeOptions, TickKind};
use crate::errors::Result;
use crate::present::{self, Presenter};
use crate::runner::{RunnerRegistry, TaskReporter};
use crate::store::DurationStore;
use crate::types::ProjectContext;

const INBOX_CAPACITY: usize = 256;

/// The one scheduled tick. Replaced, never queued.
#[derive(Debug, Clone, Copy)]
struct PendingTick {
    deadline: Instant,
    run_id: RunId,
    kind: TickKind,
}

/// Summary returned when the loop exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    pub completed_runs: usize,
    pub last_outcome: Option<bool>,
}

/// Drives the core orchestrator in response to inbound events and timer
/// ticks, and performs its commands against the runners, the duration store
/// and the presenter.
///
/// All run state is mutated from this loop only, one event at a time.
pub struct Orchestrator<P: Presenter> {
    core: CoreOrchestrator,
    project: ProjectContext,
    registry: RunnerRegistry,
    store: DurationStore,
    presenter: P,
    event_tx: mpsc::Sender<OrchestratorEvent>,
    event_rx: mpsc::Receiver<OrchestratorEvent>,
    pending_tick: Option<PendingTick>,
}

impl<P: Presenter> fmt::Debug for Orchestrator<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("core", &self.core)
            .field("project", &self.project)
            .field("registry", &self.registry)
            .field("pending_tick", &self.pending_tick)
            .finish_non_exhaustive()
    }
}

impl<P: Presenter> Orchestrator<P> {
    pub fn new(
        project: ProjectContext,
        registry: RunnerRegistry,
        store: DurationStore,
        presenter: P,
        settings: ProgressSettings,
        options: RuntimeOptions,
    ) -> (Self, OrchestratorHandle) {
        let (event_tx, event_rx) = mpsc::channel(INBOX_CAPACITY);
        let handle = OrchestratorHandle::new(event_tx.clone());
        let orchestrator = Self {
            core: CoreOrchestrator::new(settings, options),
            project,
            registry,
            store,
            presenter,
            event_tx,
            event_rx,
            pending_tick: None,
        };
        (orchestrator, handle)
    }

    /// Main event loop.
    ///
    /// - Waits for the next inbound event or the pending tick, whichever
    ///   comes first.
    /// - Feeds it into the core.
    /// - Executes the commands returned by the core.
    ///
    /// Returns an error only for duration store failures.
    pub async fn run(mut self) -> Result<RunReport> {
        info!(project = %self.project.key, "orchestrator started");

        loop {
            let event = match self.next_core_event().await {
                Some(e) => e,
                None => {
                    info!("orchestrator inbox closed; exiting");
                    break;
                }
            };

            debug!(?event, "orchestrator received event");

            let now = Instant::now().into_std();
            let step = self.core.step(event, now);

            for command in step.commands {
                self.execute_command(command)?;
            }

            if !step.keep_running {
                info!("core requested exit; stopping orchestrator");
                break;
            }
        }

        Ok(RunReport {
            completed_runs: self.core.completed_runs(),
            last_outcome: self.core.last_outcome(),
        })
    }

    /// Wait for something the core has to see. Queries and unknown runners
    /// are answered here without involving the core.
    async fn next_core_event(&mut self) -> Option<CoreEvent> {
        loop {
            let inbound = match self.pending_tick {
                Some(tick) => {
                    tokio::select! {
                        maybe = self.event_rx.recv() => maybe?,
                        _ = sleep_until(tick.deadline) => {
                            self.pending_tick = None;
                            return Some(CoreEvent::Tick { run_id: tick.run_id, kind: tick.kind });
                        }
                    }
                }
                None => self.event_rx.recv().await?,
            };

            if let Some(event) = self.translate(inbound) {
                return Some(event);
            }
        }
    }

    fn translate(&mut self, event: OrchestratorEvent) -> Option<CoreEvent> {
        match event {
            OrchestratorEvent::RunRequested { runner, task } => {
                if !self.registry.contains(&runner) {
                    warn!(runner = %runner, task = %task, "run requested for unknown runner; ignoring");
                    return None;
                }
                let identity = self.project.identity(&runner, &task);
                let estimate = self.store.estimate_for(&identity);
                Some(CoreEvent::RunRequested { identity, estimate })
            }
            OrchestratorEvent::OutputLine { run_id, line } => {
                Some(CoreEvent::OutputLine { run_id, line })
            }
            OrchestratorEvent::RunnerFinished { run_id, success } => {
                Some(CoreEvent::RunnerFinished { run_id, success })
            }
            OrchestratorEvent::ListTasks { reply } => {
                let _ = reply.send(self.registry.tasks(&self.project.dir));
                None
            }
            OrchestratorEvent::QueryStatus { reply } => {
                let _ = reply.send(self.core.status());
                None
            }
            OrchestratorEvent::ShutdownRequested => Some(CoreEvent::ShutdownRequested),
        }
    }

    /// Execute a single command from the core.
    fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::StartRunner { run_id, identity } => {
                let reporter = TaskReporter::new(run_id, self.event_tx.clone());
                self.registry
                    .start(&identity.runner, &identity.task, &self.project.dir, reporter);
            }
            CoreCommand::KillRunner { run_id, identity } => {
                debug!(run_id, task = %identity, "killing runner invocation");
                self.registry.kill(&identity.runner);
            }
            CoreCommand::ScheduleTick { run_id, kind, after } => {
                self.pending_tick = Some(PendingTick {
                    deadline: Instant::now() + after,
                    run_id,
                    kind,
                });
            }
            CoreCommand::CancelTick => {
                self.pending_tick = None;
            }
            CoreCommand::RecordDuration { identity, elapsed } => {
                self.store.record(&identity, elapsed)?;
            }
            CoreCommand::Present(event) => {
                present::dispatch(&mut self.presenter, event);
            }
        }
        Ok(())
    }
}

// src/engine/core.rs

//! Pure core orchestrator state machine.
//!
//! This module contains a synchronous, deterministic core that consumes
//! [`CoreEvent`]s together with the current time and produces:
//! - an updated run state
//! - a list of commands describing what the IO shell should do next
//!
//! The async shell (`engine::runtime::Orchestrator`) is responsible for:
//! - reading events from the inbox
//! - owning the single pending tick deadline
//! - starting/killing runners, writing the duration store, notifying the
//!   presenter
//!
//! The core has no Tokio types, channels, filesystem, or processes, so it can
//! be driven step by step with a synthetic clock.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::engine::event_handlers::{
    handle_output_line, handle_run_request, handle_runner_finished, handle_shutdown, handle_tick,
    CoreStep,
};
use crate::engine::progress::{ExpectedDuration, ProgressSettings};
use crate::engine::{RunId, RunStatus, RuntimeOptions, TickKind};
use crate::types::{Progress, TaskIdentity};

/// Input of one core step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Run/kill toggle, with the estimate looked up by the shell.
    RunRequested {
        identity: TaskIdentity,
        estimate: Option<Duration>,
    },
    /// The pending tick fired.
    Tick { run_id: RunId, kind: TickKind },
    OutputLine { run_id: RunId, line: String },
    RunnerFinished { run_id: RunId, success: bool },
    ShutdownRequested,
}

/// State of an in-flight run.
#[derive(Debug, Clone)]
pub(crate) struct RunningTask {
    pub(crate) run_id: RunId,
    pub(crate) identity: TaskIdentity,
    pub(crate) started_at: Instant,
    pub(crate) expected: ExpectedDuration,
    pub(crate) killed: bool,
    pub(crate) last_percent: Option<u8>,
    pub(crate) frame: usize,
}

impl RunningTask {
    pub(crate) fn last_progress(&self) -> Option<Progress> {
        match self.expected {
            ExpectedDuration::Unknown if self.frame > 0 => Some(Progress::Frame(self.frame)),
            ExpectedDuration::Unknown => None,
            ExpectedDuration::Known(_) => self.last_percent.map(Progress::Percent),
        }
    }
}

/// State of a run whose runner reported back while the fast-forward
/// animation is still playing.
#[derive(Debug, Clone)]
pub(crate) struct FinishingTask {
    pub(crate) run_id: RunId,
    pub(crate) identity: TaskIdentity,
    pub(crate) success: bool,
    pub(crate) simulated: u8,
}

#[derive(Debug, Clone)]
pub(crate) enum Phase {
    Idle,
    Running(RunningTask),
    Finishing(FinishingTask),
}

/// Pure core orchestrator.
///
/// Owns the one and only run state. At most one run exists at any time; the
/// state returns to idle only in the step that delivers the terminal
/// notification.
#[derive(Debug)]
pub struct CoreOrchestrator {
    phase: Phase,
    settings: ProgressSettings,
    options: RuntimeOptions,
    next_run_id: RunId,
    completed_runs: usize,
    last_outcome: Option<bool>,
}

impl CoreOrchestrator {
    pub fn new(settings: ProgressSettings, options: RuntimeOptions) -> Self {
        Self {
            phase: Phase::Idle,
            settings,
            options,
            next_run_id: 1,
            completed_runs: 0,
            last_outcome: None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    pub fn settings(&self) -> &ProgressSettings {
        &self.settings
    }

    /// Number of runs that delivered a terminal notification.
    pub fn completed_runs(&self) -> usize {
        self.completed_runs
    }

    /// Outcome of the most recent terminal notification.
    pub fn last_outcome(&self) -> Option<bool> {
        self.last_outcome
    }

    pub fn status(&self) -> RunStatus {
        match &self.phase {
            Phase::Idle => RunStatus::Idle,
            Phase::Running(run) => RunStatus::Running {
                identity: run.identity.clone(),
                indeterminate: run.expected.is_indeterminate(),
                killed: run.killed,
                progress: run.last_progress(),
            },
            Phase::Finishing(fin) => RunStatus::Finishing {
                identity: fin.identity.clone(),
                success: fin.success,
            },
        }
    }

    /// Handle a single event, updating the run state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: CoreEvent, now: Instant) -> CoreStep {
        let step = match event {
            CoreEvent::RunRequested { identity, estimate } => handle_run_request(
                &mut self.phase,
                &mut self.next_run_id,
                identity,
                estimate,
                now,
            ),
            CoreEvent::Tick { run_id, kind } => {
                handle_tick(&mut self.phase, &self.settings, run_id, kind, now)
            }
            CoreEvent::OutputLine { run_id, line } => {
                handle_output_line(&self.phase, run_id, line)
            }
            CoreEvent::RunnerFinished { run_id, success } => {
                handle_runner_finished(&mut self.phase, run_id, success, now)
            }
            CoreEvent::ShutdownRequested => handle_shutdown(&self.phase),
        };

        self.after_step(step)
    }

    fn after_step(&mut self, mut step: CoreStep) -> CoreStep {
        if let Some(success) = step.terminal_outcome() {
            self.completed_runs += 1;
            self.last_outcome = Some(success);

            if self.options.exit_when_idle {
                debug!("run finished and exit_when_idle is set; requesting exit");
                step.keep_running = false;
            }
        }
        step
    }
}

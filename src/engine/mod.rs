// src/engine/mod.rs

//! Task execution orchestrator.
//!
//! This module ties together:
//! - the single-flight run/kill state machine
//! - the duration-based progress simulation and fast-forward sequence
//! - the async loop that reacts to:
//!   - run/kill requests
//!   - runner output and terminal callbacks
//!   - progress ticks
//!   - shutdown signals
//!
//! The pure state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::collections::BTreeMap;

use tokio::sync::oneshot;

use crate::types::{Progress, TaskIdentity};

/// Identifier of one accepted run. Strictly increasing per orchestrator.
pub type RunId = u64;

/// runner name -> task names, runners without tasks omitted.
pub type TaskListing = BTreeMap<String, Vec<String>>;

/// Which timer a tick belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickKind {
    /// Mid-run progress update.
    Progress,
    /// One step of the terminal fast-forward animation.
    FastForward,
}

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the loop after the first run delivers its terminal
    /// notification (used by `taskpulse run`).
    pub exit_when_idle: bool,
}

/// Consistent snapshot of the orchestrator state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Idle,
    Running {
        identity: TaskIdentity,
        indeterminate: bool,
        killed: bool,
        progress: Option<Progress>,
    },
    Finishing {
        identity: TaskIdentity,
        success: bool,
    },
}

impl RunStatus {
    pub fn is_idle(&self) -> bool {
        matches!(self, RunStatus::Idle)
    }

    pub fn identity(&self) -> Option<&TaskIdentity> {
        match self {
            RunStatus::Idle => None,
            RunStatus::Running { identity, .. } | RunStatus::Finishing { identity, .. } => {
                Some(identity)
            }
        }
    }
}

/// Events flowing into the orchestrator from callers, runners and signals.
#[derive(Debug)]
pub enum OrchestratorEvent {
    /// Toggle: start the task when idle, kill it when it is the one running.
    RunRequested { runner: String, task: String },
    /// One line of output from the runner of `run_id`.
    OutputLine { run_id: RunId, line: String },
    /// Terminal callback from the runner of `run_id`.
    RunnerFinished { run_id: RunId, success: bool },
    /// Aggregate task listing of all runners.
    ListTasks { reply: oneshot::Sender<TaskListing> },
    /// Current state snapshot.
    QueryStatus { reply: oneshot::Sender<RunStatus> },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod progress;
pub mod runtime;

pub use core::{CoreEvent, CoreOrchestrator};
pub use event_handlers::{CoreCommand, CoreStep};
pub use handle::OrchestratorHandle;
pub use progress::{ExpectedDuration, ProgressSettings};
pub use runtime::{Orchestrator, RunReport};

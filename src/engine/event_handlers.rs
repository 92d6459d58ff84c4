// src/engine/event_handlers.rs

//! Per-event transition functions used by [`CoreOrchestrator`](super::CoreOrchestrator).

use std::mem;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::engine::core::{FinishingTask, Phase, RunningTask};
use crate::engine::progress::{
    fast_forward_start, next_frame, running_percent, ExpectedDuration, ProgressSettings,
};
use crate::engine::{RunId, TickKind};
use crate::present::PresentationEvent;
use crate::types::{Progress, TaskIdentity};

/// Something the IO shell must do on behalf of the core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Ask the runner to start the task, reporting back under `run_id`.
    StartRunner { run_id: RunId, identity: TaskIdentity },
    /// Ask the runner to kill its in-flight invocation.
    KillRunner { run_id: RunId, identity: TaskIdentity },
    /// Replace the pending tick with one firing `after` from now.
    ScheduleTick {
        run_id: RunId,
        kind: TickKind,
        after: Duration,
    },
    /// Drop the pending tick, if any.
    CancelTick,
    /// Persist the observed duration of a successful run.
    RecordDuration {
        identity: TaskIdentity,
        elapsed: Duration,
    },
    /// Forward to the presenter.
    Present(PresentationEvent),
}

/// Result of one core step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    pub keep_running: bool,
}

impl CoreStep {
    fn with(commands: Vec<CoreCommand>) -> Self {
        Self {
            commands,
            keep_running: true,
        }
    }

    fn nothing() -> Self {
        Self::with(Vec::new())
    }

    /// The success flag of the terminal notification in this step, if any.
    pub fn terminal_outcome(&self) -> Option<bool> {
        self.commands.iter().find_map(|c| match c {
            CoreCommand::Present(PresentationEvent::Finished { success }) => Some(*success),
            _ => None,
        })
    }

    /// All progress values presented in this step, in order.
    pub fn progress_updates(&self) -> impl Iterator<Item = Progress> + '_ {
        self.commands.iter().filter_map(|c| match c {
            CoreCommand::Present(PresentationEvent::Progress(p)) => Some(*p),
            _ => None,
        })
    }
}

/// Idle: start. Running the same task: kill. Anything else: ignore.
pub fn handle_run_request(
    phase: &mut Phase,
    next_run_id: &mut RunId,
    identity: TaskIdentity,
    estimate: Option<Duration>,
    now: Instant,
) -> CoreStep {
    match phase {
        Phase::Idle => {
            let run_id = *next_run_id;
            *next_run_id += 1;

            let expected = ExpectedDuration::from_estimate(estimate);
            info!(
                run_id,
                task = %identity,
                expected_ms = ?estimate.map(|d| d.as_millis()),
                "starting task"
            );

            *phase = Phase::Running(RunningTask {
                run_id,
                identity: identity.clone(),
                started_at: now,
                expected,
                killed: false,
                last_percent: None,
                frame: 0,
            });

            CoreStep::with(vec![
                CoreCommand::Present(PresentationEvent::Started {
                    identity: identity.clone(),
                    indeterminate: expected.is_indeterminate(),
                }),
                CoreCommand::StartRunner { run_id, identity },
                // Zero delay: the first tick is delivered by the loop, never
                // synchronously inside this request.
                CoreCommand::ScheduleTick {
                    run_id,
                    kind: TickKind::Progress,
                    after: Duration::ZERO,
                },
            ])
        }
        Phase::Running(run) if run.identity == identity => {
            if run.killed {
                debug!(run_id = run.run_id, task = %identity, "kill already requested; ignoring");
                return CoreStep::nothing();
            }
            info!(run_id = run.run_id, task = %identity, "kill requested for running task");
            run.killed = true;
            CoreStep::with(vec![CoreCommand::KillRunner {
                run_id: run.run_id,
                identity,
            }])
        }
        Phase::Running(run) => {
            info!(
                running = %run.identity,
                requested = %identity,
                "another task is running; ignoring run request"
            );
            CoreStep::nothing()
        }
        Phase::Finishing(fin) => {
            info!(
                finishing = %fin.identity,
                requested = %identity,
                "task is finishing; ignoring run request"
            );
            CoreStep::nothing()
        }
    }
}

pub fn handle_tick(
    phase: &mut Phase,
    settings: &ProgressSettings,
    run_id: RunId,
    kind: TickKind,
    now: Instant,
) -> CoreStep {
    match (kind, &mut *phase) {
        (TickKind::Progress, Phase::Running(run)) if run.run_id == run_id => {
            let elapsed = now.saturating_duration_since(run.started_at);

            if let Some(limit) = settings.watchdog {
                if elapsed >= limit {
                    return expire_watchdog(phase, elapsed);
                }
            }

            let progress = match run.expected {
                ExpectedDuration::Unknown => {
                    run.frame = next_frame(run.frame, settings.indeterminate_frames);
                    Progress::Frame(run.frame)
                }
                ExpectedDuration::Known(expected) => {
                    let pct = running_percent(elapsed, expected).max(run.last_percent.unwrap_or(0));
                    run.last_percent = Some(pct);
                    Progress::Percent(pct)
                }
            };

            CoreStep::with(vec![
                CoreCommand::Present(PresentationEvent::Progress(progress)),
                CoreCommand::ScheduleTick {
                    run_id,
                    kind: TickKind::Progress,
                    after: run.expected.tick_interval(settings),
                },
            ])
        }
        (TickKind::FastForward, Phase::Finishing(fin)) if fin.run_id == run_id => {
            fin.simulated = fin.simulated.saturating_add(1).min(100);
            let mut commands = vec![CoreCommand::Present(PresentationEvent::Progress(
                Progress::Percent(fin.simulated),
            ))];

            if fin.simulated >= 100 {
                let success = fin.success;
                info!(run_id, task = %fin.identity, success, "task finished");
                commands.push(CoreCommand::Present(PresentationEvent::Finished { success }));
                *phase = Phase::Idle;
            } else {
                commands.push(CoreCommand::ScheduleTick {
                    run_id,
                    kind: TickKind::FastForward,
                    after: settings.fast_forward_interval,
                });
            }
            CoreStep::with(commands)
        }
        _ => {
            debug!(run_id, ?kind, "stale tick; ignoring");
            CoreStep::nothing()
        }
    }
}

/// The runner never reported back in time: treat the run as killed and
/// finish it now. A late terminal callback is ignored as stale.
fn expire_watchdog(phase: &mut Phase, elapsed: Duration) -> CoreStep {
    let Phase::Running(run) = mem::replace(phase, Phase::Idle) else {
        return CoreStep::nothing();
    };

    warn!(
        run_id = run.run_id,
        task = %run.identity,
        elapsed_ms = elapsed.as_millis() as u64,
        "watchdog expired; abandoning run"
    );

    let mut commands = Vec::new();
    if !run.killed {
        commands.push(CoreCommand::KillRunner {
            run_id: run.run_id,
            identity: run.identity,
        });
    }
    commands.push(CoreCommand::CancelTick);
    commands.push(CoreCommand::Present(PresentationEvent::Finished {
        success: false,
    }));
    CoreStep::with(commands)
}

pub fn handle_output_line(phase: &Phase, run_id: RunId, line: String) -> CoreStep {
    let current = match phase {
        Phase::Running(run) => Some(run.run_id),
        Phase::Finishing(fin) => Some(fin.run_id),
        Phase::Idle => None,
    };

    if current == Some(run_id) {
        CoreStep::with(vec![CoreCommand::Present(PresentationEvent::Output(line))])
    } else {
        debug!(run_id, "output from a run that is no longer current; dropping");
        CoreStep::nothing()
    }
}

pub fn handle_runner_finished(
    phase: &mut Phase,
    run_id: RunId,
    success: bool,
    now: Instant,
) -> CoreStep {
    let is_current = matches!(phase, Phase::Running(run) if run.run_id == run_id);
    if !is_current {
        warn!(run_id, success, "terminal callback for a run that is not running; ignoring");
        return CoreStep::nothing();
    }

    let Phase::Running(run) = mem::replace(phase, Phase::Idle) else {
        return CoreStep::nothing();
    };

    let mut commands = vec![CoreCommand::CancelTick];

    // A killed run always ends as a failure, whatever the runner reported,
    // and neither updates the estimate nor animates.
    if run.killed {
        info!(run_id, task = %run.identity, reported = success, "killed task finished");
        commands.push(CoreCommand::Present(PresentationEvent::Finished {
            success: false,
        }));
        return CoreStep::with(commands);
    }

    let elapsed = now.saturating_duration_since(run.started_at);
    debug!(
        run_id,
        task = %run.identity,
        success,
        elapsed_ms = elapsed.as_millis() as u64,
        "runner reported completion"
    );

    if success {
        commands.push(CoreCommand::RecordDuration {
            identity: run.identity.clone(),
            elapsed,
        });
    }

    let start = match run.expected {
        ExpectedDuration::Known(expected) => fast_forward_start(run.last_percent, elapsed, expected),
        ExpectedDuration::Unknown => None,
    };

    match start {
        Some(simulated) => {
            debug!(run_id, from = simulated, "fast-forwarding progress");
            *phase = Phase::Finishing(FinishingTask {
                run_id,
                identity: run.identity,
                success,
                simulated,
            });
            commands.push(CoreCommand::ScheduleTick {
                run_id,
                kind: TickKind::FastForward,
                after: Duration::ZERO,
            });
        }
        None => {
            info!(run_id, task = %run.identity, success, "task finished");
            commands.push(CoreCommand::Present(PresentationEvent::Finished { success }));
        }
    }

    CoreStep::with(commands)
}

pub fn handle_shutdown(phase: &Phase) -> CoreStep {
    let mut commands = vec![CoreCommand::CancelTick];
    if let Phase::Running(run) = phase {
        if !run.killed {
            info!(run_id = run.run_id, task = %run.identity, "shutting down; killing running task");
            commands.push(CoreCommand::KillRunner {
                run_id: run.run_id,
                identity: run.identity.clone(),
            });
        }
    }
    CoreStep {
        commands,
        keep_running: false,
    }
}

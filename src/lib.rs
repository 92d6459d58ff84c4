// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod present;
pub mod runner;
pub mod store;
pub mod types;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{load_or_default, ConfigFile};
use crate::engine::{
    Orchestrator, OrchestratorHandle, RunReport, RunStatus, RuntimeOptions, TaskListing,
};
use crate::fs::{FileSystem, RealFileSystem};
use crate::present::TerminalPresenter;
use crate::runner::RunnerRegistry;
use crate::store::DurationStore;
use crate::types::ProjectContext;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project + config resolution
/// - the runner registry
/// - the duration store
/// - the orchestrator and its presenter
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<ExitCode> {
    let project_dir = resolve_project_dir(args.project.as_deref())?;
    let cfg = load_or_default(args.config.as_deref(), &project_dir)?;
    let project = ProjectContext::new(project_dir, cfg.project_key.clone());
    info!(project = %project.key, dir = ?project.dir, "project resolved");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let registry = RunnerRegistry::from_config(&cfg, fs.clone())?;

    match args.command {
        Command::List => {
            print_tasks(&registry.tasks(&project.dir));
            Ok(ExitCode::SUCCESS)
        }
        Command::Estimates => {
            let store = open_store(&cfg, &project, fs)?;
            print_estimates(&store, &project);
            Ok(ExitCode::SUCCESS)
        }
        Command::Run { runner, task } => {
            let store = open_store(&cfg, &project, fs)?;
            run_once(&cfg, project, registry, store, runner, task).await
        }
        Command::Interactive => {
            let store = open_store(&cfg, &project, fs)?;
            run_interactive(&cfg, project, registry, store).await
        }
    }
}

fn resolve_project_dir(explicit: Option<&Path>) -> Result<PathBuf> {
    let dir = match explicit {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().context("resolving current directory")?,
    };
    let dir = dir
        .canonicalize()
        .with_context(|| format!("resolving project directory {:?}", dir))?;
    if !dir.is_dir() {
        bail!("project path {:?} is not a directory", dir);
    }
    Ok(dir)
}

/// Store path from the config, relative to the project directory unless
/// absolute.
fn open_store(
    cfg: &ConfigFile,
    project: &ProjectContext,
    fs: Arc<dyn FileSystem>,
) -> Result<DurationStore> {
    let path = if cfg.store_path.is_absolute() {
        cfg.store_path.clone()
    } else {
        project.dir.join(&cfg.store_path)
    };
    Ok(DurationStore::open(fs, path)?)
}

async fn run_once(
    cfg: &ConfigFile,
    project: ProjectContext,
    registry: RunnerRegistry,
    store: DurationStore,
    runner: String,
    task: String,
) -> Result<ExitCode> {
    let listing = registry.tasks(&project.dir);
    let known = listing
        .get(&runner)
        .is_some_and(|tasks| tasks.iter().any(|t| t == &task));
    if !known {
        print_tasks(&listing);
        bail!("unknown task '{task}' for runner '{runner}'");
    }

    let options = RuntimeOptions {
        exit_when_idle: true,
    };
    let (orchestrator, handle) = Orchestrator::new(
        project,
        registry,
        store,
        TerminalPresenter::new(),
        cfg.progress,
        options,
    );

    handle.run_task(runner.as_str(), task.as_str()).await?;

    // Ctrl-C → the same toggle again, which kills the running task.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = handle.run_task(runner, task).await;
        });
    }

    let report = orchestrator.run().await?;
    debug!(?report, "run finished");

    Ok(match report.last_outcome {
        Some(true) => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

async fn run_interactive(
    cfg: &ConfigFile,
    project: ProjectContext,
    registry: RunnerRegistry,
    store: DurationStore,
) -> Result<ExitCode> {
    let (orchestrator, handle) = Orchestrator::new(
        project,
        registry,
        store,
        TerminalPresenter::new(),
        cfg.progress,
        RuntimeOptions::default(),
    );
    let orchestrator = tokio::spawn(orchestrator.run());

    // Ctrl-C → graceful shutdown.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = handle.shutdown().await;
        });
    }

    print_tasks(&handle.tasks().await?);

    let input = BufReader::new(tokio::io::stdin());
    let report = interactive_session(&handle, orchestrator, input).await?;
    debug!(?report, "interactive session finished");
    Ok(ExitCode::SUCCESS)
}

/// Feed `<runner> <task>` lines from `input` to the orchestrator until the
/// user quits, the input ends or the orchestrator stops on its own.
///
/// A fatal orchestrator error (e.g. the duration store could not be written)
/// is returned as soon as the loop ends, without waiting for more input.
pub async fn interactive_session<R>(
    handle: &OrchestratorHandle,
    mut orchestrator: JoinHandle<errors::Result<RunReport>>,
    input: R,
) -> Result<RunReport>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            joined = &mut orchestrator => {
                let report = joined.context("joining orchestrator task")??;
                debug!(?report, "orchestrator stopped; ending interactive session");
                return Ok(report);
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match handle_interactive_line(handle, line.trim()).await {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(err) => {
                        // The channel only closes when the loop is gone;
                        // report why it stopped instead.
                        orchestrator.await.context("joining orchestrator task")??;
                        return Err(err);
                    }
                }
            }
        }
    }

    // The user quit or the input closed.
    let _ = handle.shutdown().await;
    let report = orchestrator.await.context("joining orchestrator task")??;
    Ok(report)
}

/// Returns `false` when the session should end.
async fn handle_interactive_line(handle: &OrchestratorHandle, line: &str) -> Result<bool> {
    let mut words = line.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (None, _, _) => {}
        (Some("quit" | "exit"), None, _) => return Ok(false),
        (Some("list"), None, _) => print_tasks(&handle.tasks().await?),
        (Some("status"), None, _) => print_status(&handle.status().await?),
        (Some(runner), Some(task), None) => handle.run_task(runner, task).await?,
        _ => eprintln!("expected `<runner> <task>`, `list`, `status` or `quit`"),
    }
    Ok(true)
}

fn print_tasks(listing: &TaskListing) {
    if listing.is_empty() {
        println!("no tasks found");
        return;
    }
    for (runner, tasks) in listing {
        println!("{runner}:");
        for task in tasks {
            println!("  - {task}");
        }
    }
}

fn print_status(status: &RunStatus) {
    match status {
        RunStatus::Idle => println!("idle"),
        RunStatus::Running {
            identity,
            killed,
            progress,
            ..
        } => {
            let killed = if *killed { " (killing)" } else { "" };
            println!(
                "running {} {}{killed} {:?}",
                identity.runner, identity.task, progress
            );
        }
        RunStatus::Finishing { identity, success } => {
            println!(
                "finishing {} {} (success: {success})",
                identity.runner, identity.task
            );
        }
    }
}

fn print_estimates(store: &DurationStore, project: &ProjectContext) {
    let durations = store.project_durations(&project.key);
    if durations.is_empty() {
        println!("no estimates recorded for project '{}'", project.key);
        return;
    }
    for (runner, tasks) in durations {
        println!("{runner}:");
        for (task, millis) in tasks {
            println!("  - {task}: {millis}ms");
        }
    }
}

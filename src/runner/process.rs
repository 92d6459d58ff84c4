// src/runner/process.rs

//! Process plumbing shared by all process-backed runners.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, warn};

use super::reporter::{OutputSink, TaskReporter};

const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// A program invocation: what to run and where.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I, cwd: &Path) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Run a command line through the platform shell.
    pub fn shell(command_line: &str, cwd: &Path) -> Self {
        if cfg!(windows) {
            Self::new("cmd", ["/C", command_line], cwd)
        } else {
            Self::new("sh", ["-c", command_line], cwd)
        }
    }
}

/// Handle of a spawned invocation.
///
/// - `cancel` asks the process task to kill the child.
/// - `handle` is the Tokio task driving the process.
#[derive(Debug)]
pub struct ActiveProcess {
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl ActiveProcess {
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Request the child be killed. Returns `false` if it already exited or
    /// a kill was already requested.
    pub fn kill(&mut self) -> bool {
        match self.cancel.take() {
            Some(cancel) => cancel.send(()).is_ok(),
            None => false,
        }
    }
}

/// At most one live invocation per runner.
#[derive(Debug, Default)]
pub struct ProcessSlot {
    active: Option<ActiveProcess>,
}

impl ProcessSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch(&mut self, label: String, invocation: Invocation, reporter: TaskReporter) {
        if let Some(previous) = &self.active {
            if !previous.is_finished() {
                warn!(task = %label, "previous invocation still running while starting a new one");
            }
        }
        self.active = Some(spawn_process(label, invocation, reporter));
    }

    pub fn kill(&mut self, runner: &str) {
        match self.active.as_mut() {
            Some(active) => {
                if !active.kill() {
                    debug!(runner, "process already exited or kill already requested");
                }
            }
            None => debug!(runner, "kill requested but nothing was started"),
        }
    }
}

/// Spawn `invocation` in the background, streaming its output to the
/// reporter and delivering exactly one terminal callback.
pub fn spawn_process(label: String, invocation: Invocation, reporter: TaskReporter) -> ActiveProcess {
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(run_process(label, invocation, reporter, cancel_rx));
    ActiveProcess {
        cancel: Some(cancel_tx),
        handle,
    }
}

async fn run_process(
    label: String,
    invocation: Invocation,
    reporter: TaskReporter,
    cancel_rx: oneshot::Receiver<()>,
) {
    let run_id = reporter.run_id();
    let success = match run_process_inner(&label, &invocation, reporter.output_sink(), cancel_rx).await {
        Ok(success) => success,
        Err(err) => {
            error!(task = %label, run_id, error = %err, "task execution error");
            let _ = reporter.output_line(format!("taskpulse: {err:#}")).await;
            false
        }
    };
    reporter.finish(success).await;
}

async fn run_process_inner(
    label: &str,
    invocation: &Invocation,
    sink: OutputSink,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<bool> {
    info!(
        task = %label,
        program = %invocation.program,
        args = ?invocation.args,
        cwd = ?invocation.cwd,
        "starting task process"
    );

    let mut cmd = Command::new(&invocation.program);
    cmd.args(&invocation.args)
        .current_dir(&invocation.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{}` for task '{}'", invocation.program, label))?;

    let mut pumps = Vec::new();
    if let Some(stdout) = child.stdout.take() {
        pumps.push(tokio::spawn(pump_lines(stdout, sink.clone())));
    }
    if let Some(stderr) = child.stderr.take() {
        pumps.push(tokio::spawn(pump_lines(stderr, sink.clone())));
    }

    // Either the process exits on its own, or a kill is requested.
    let (success, killed) = tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for process of task '{}'", label))?;
            info!(
                task = %label,
                exit_code = status.code().unwrap_or(-1),
                success = status.success(),
                "task process exited"
            );
            (status.success(), false)
        }

        cancel = &mut cancel_rx => {
            if cancel.is_err() {
                debug!(task = %label, "cancel handle dropped; killing process");
            } else {
                info!(task = %label, "kill requested; killing process");
            }
            if let Err(e) = child.kill().await {
                warn!(task = %label, error = %e, "failed to kill child process");
            }
            (false, true)
        }
    };

    // Drain remaining output so every line arrives before the terminal
    // callback. Orphaned grandchildren may keep a pipe open, so the wait is
    // bounded, and skipped entirely after a kill.
    for mut pump in pumps {
        if killed {
            pump.abort();
            continue;
        }
        if timeout(OUTPUT_DRAIN_TIMEOUT, &mut pump).await.is_err() {
            debug!(task = %label, "output still open after exit; detaching");
            pump.abort();
        }
    }

    Ok(success)
}

/// Forward `reader` line by line. Bytes that are not valid UTF-8 are
/// replaced rather than ending the stream.
async fn pump_lines<R>(reader: R, sink: OutputSink)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                if !sink.line(decode_line(&buf)).await {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "output stream ended with error");
                break;
            }
        }
    }
}

/// Strip the line terminator (`\n` or `\r\n`) and decode lossily.
pub fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

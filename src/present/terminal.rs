// src/present/terminal.rs

use std::fmt;
use std::io::{self, IsTerminal, Write};

use crossterm::cursor::MoveToColumn;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};

use crate::types::{Progress, TaskIdentity};

use super::Presenter;

const BAR_WIDTH: usize = 30;
const SPINNER: [char; 8] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧'];

/// Renders a single status line on stderr and task output on stdout.
///
/// When the status stream is not a terminal, the line is not redrawn in
/// place; only the start and the outcome are written, one line each.
pub struct TerminalPresenter {
    label: String,
    status: String,
    status_out: Box<dyn Write + Send>,
    live: bool,
}

impl fmt::Debug for TerminalPresenter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalPresenter")
            .field("label", &self.label)
            .field("status", &self.status)
            .field("live", &self.live)
            .finish_non_exhaustive()
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalPresenter {
    pub fn new() -> Self {
        let live = io::stderr().is_terminal();
        Self::with_status_writer(Box::new(io::stderr()), live)
    }

    /// Write the status line to `out`. `live` redraws it in place.
    pub fn with_status_writer(out: Box<dyn Write + Send>, live: bool) -> Self {
        Self {
            label: String::new(),
            status: String::new(),
            status_out: out,
            live,
        }
    }

    fn redraw(&mut self) {
        if !self.live {
            return;
        }
        let _ = queue!(self.status_out, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = write!(self.status_out, "{} {}", self.label, self.status);
        let _ = self.status_out.flush();
    }

    fn clear_status_line(&mut self) {
        if !self.live {
            return;
        }
        let _ = queue!(self.status_out, MoveToColumn(0), Clear(ClearType::CurrentLine));
        let _ = self.status_out.flush();
    }

    fn write_plain_line(&mut self) {
        let _ = writeln!(self.status_out, "{} {}", self.label, self.status);
        let _ = self.status_out.flush();
    }
}

/// `[#########---------]  45%`
pub fn render_bar(percent: u8) -> String {
    let percent = usize::from(percent.min(100));
    let filled = percent * BAR_WIDTH / 100;
    format!(
        "[{}{}] {:>3}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        percent
    )
}

pub fn render_spinner(frame: usize) -> String {
    format!("{} running", SPINNER[frame % SPINNER.len()])
}

impl Presenter for TerminalPresenter {
    fn task_started(&mut self, identity: &TaskIdentity, indeterminate: bool) {
        self.label = format!("{} {}", identity.runner, identity.task);
        self.status = if indeterminate {
            render_spinner(0)
        } else {
            render_bar(0)
        };
        if self.live {
            self.redraw();
        } else {
            self.write_plain_line();
        }
    }

    fn task_progress(&mut self, progress: Progress) {
        self.status = match progress {
            Progress::Percent(pct) => render_bar(pct),
            Progress::Frame(frame) => render_spinner(frame),
        };
        self.redraw();
    }

    fn task_finished(&mut self, success: bool) {
        self.status = if success {
            "done".to_string()
        } else {
            "failed".to_string()
        };
        if self.live {
            self.redraw();
            let _ = writeln!(self.status_out);
        } else {
            self.write_plain_line();
        }
    }

    fn output_line(&mut self, line: &str) {
        self.clear_status_line();
        let mut out = io::stdout().lock();
        let _ = writeln!(out, "{line}");
        let _ = out.flush();
        drop(out);
        self.redraw();
    }
}

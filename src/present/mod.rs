// src/present/mod.rs

//! Presentation seam.
//!
//! The orchestrator reports start, progress, output and the terminal outcome
//! through a [`Presenter`]. How that is rendered is up to the implementation.

pub mod terminal;

use crate::types::{Progress, TaskIdentity};

pub use terminal::TerminalPresenter;

/// One notification for the presentation layer, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresentationEvent {
    Started {
        identity: TaskIdentity,
        indeterminate: bool,
    },
    Progress(Progress),
    Finished {
        success: bool,
    },
    Output(String),
}

/// Receiver of orchestrator notifications.
///
/// Called from the orchestrator loop only, one call at a time.
pub trait Presenter: Send {
    /// A run started. Output of previous runs may be discarded.
    fn task_started(&mut self, identity: &TaskIdentity, indeterminate: bool);

    fn task_progress(&mut self, progress: Progress);

    /// Terminal notification; exactly one per started run.
    fn task_finished(&mut self, success: bool);

    fn output_line(&mut self, line: &str);
}

impl<P: Presenter + ?Sized> Presenter for Box<P> {
    fn task_started(&mut self, identity: &TaskIdentity, indeterminate: bool) {
        (**self).task_started(identity, indeterminate)
    }

    fn task_progress(&mut self, progress: Progress) {
        (**self).task_progress(progress)
    }

    fn task_finished(&mut self, success: bool) {
        (**self).task_finished(success)
    }

    fn output_line(&mut self, line: &str) {
        (**self).output_line(line)
    }
}

/// Route an event to the matching presenter method.
pub fn dispatch<P: Presenter + ?Sized>(presenter: &mut P, event: PresentationEvent) {
    match event {
        PresentationEvent::Started {
            identity,
            indeterminate,
        } => presenter.task_started(&identity, indeterminate),
        PresentationEvent::Progress(progress) => presenter.task_progress(progress),
        PresentationEvent::Finished { success } => presenter.task_finished(success),
        PresentationEvent::Output(line) => presenter.output_line(&line),
    }
}

use std::sync::{Arc, Mutex};

use taskpulse::present::{PresentationEvent, Presenter};
use taskpulse::types::{Progress, TaskIdentity};

/// Presenter that records every notification, in order.
#[derive(Debug, Clone, Default)]
pub struct RecordingPresenter {
    events: Arc<Mutex<Vec<PresentationEvent>>>,
}

impl RecordingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PresentationEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Percentages presented so far, in order.
    pub fn percents(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Progress(Progress::Percent(p)) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Spinner frames presented so far, in order.
    pub fn frames(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Progress(Progress::Frame(f)) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn outcomes(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Finished { success } => Some(success),
                _ => None,
            })
            .collect()
    }

    pub fn started(&self) -> Vec<(TaskIdentity, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Started {
                    identity,
                    indeterminate,
                } => Some((identity, indeterminate)),
                _ => None,
            })
            .collect()
    }

    pub fn output(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PresentationEvent::Output(line) => Some(line),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: PresentationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl Presenter for RecordingPresenter {
    fn task_started(&mut self, identity: &TaskIdentity, indeterminate: bool) {
        self.push(PresentationEvent::Started {
            identity: identity.clone(),
            indeterminate,
        });
    }

    fn task_progress(&mut self, progress: Progress) {
        self.push(PresentationEvent::Progress(progress));
    }

    fn task_finished(&mut self, success: bool) {
        self.push(PresentationEvent::Finished { success });
    }

    fn output_line(&mut self, line: &str) {
        self.push(PresentationEvent::Output(line.to_string()));
    }
}

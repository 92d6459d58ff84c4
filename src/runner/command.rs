// src/runner/command.rs

//! Runner whose tasks are command lines from `[runner.<name>.tasks]`.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::warn;

use super::process::{Invocation, ProcessSlot};
use super::{TaskReporter, TaskRunner};

#[derive(Debug)]
pub struct CommandRunner {
    name: String,
    tasks: BTreeMap<String, String>,
    slot: ProcessSlot,
}

impl CommandRunner {
    pub fn new(name: impl Into<String>, tasks: BTreeMap<String, String>) -> Self {
        Self {
            name: name.into(),
            tasks,
            slot: ProcessSlot::new(),
        }
    }
}

impl TaskRunner for CommandRunner {
    fn name(&self) -> &str {
        &self.name
    }

    fn list_tasks(&self, _project_dir: &Path) -> Vec<String> {
        self.tasks.keys().cloned().collect()
    }

    fn start(&mut self, task: &str, project_dir: &Path, reporter: TaskReporter) {
        let Some(command_line) = self.tasks.get(task) else {
            warn!(runner = %self.name, task, "unknown task; reporting failure");
            reporter.finish_detached(false);
            return;
        };
        let invocation = Invocation::shell(command_line, project_dir);
        self.slot
            .launch(format!("{}:{}", self.name, task), invocation, reporter);
    }

    fn kill(&mut self) {
        self.slot.kill(&self.name);
    }
}

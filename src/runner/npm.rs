// src/runner/npm.rs

//! `npm run <script>` for the scripts of the project's `package.json`.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::fs::FileSystem;

use super::process::{Invocation, ProcessSlot};
use super::{TaskReporter, TaskRunner};

pub const NPM_RUNNER_NAME: &str = "NPM";
pub const PACKAGE_JSON: &str = "package.json";

#[derive(Debug)]
pub struct NpmRunner {
    fs: Arc<dyn FileSystem>,
    program: String,
    slot: ProcessSlot,
}

impl NpmRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        let program = if cfg!(windows) { "npm.cmd" } else { "npm" };
        Self {
            fs,
            program: program.to_string(),
            slot: ProcessSlot::new(),
        }
    }

    /// Override the `npm` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

/// Script names of a `package.json` document, in file order.
pub fn scripts_from_package_json(contents: &str) -> Option<Vec<String>> {
    let json: Value = serde_json::from_str(contents).ok()?;
    let scripts = json.get("scripts")?.as_object()?;
    Some(scripts.keys().cloned().collect())
}

impl TaskRunner for NpmRunner {
    fn name(&self) -> &str {
        NPM_RUNNER_NAME
    }

    fn list_tasks(&self, project_dir: &Path) -> Vec<String> {
        let path = project_dir.join(PACKAGE_JSON);
        if !self.fs.is_file(&path) {
            debug!(path = ?path, "no package.json; NPM has no tasks");
            return Vec::new();
        }

        let contents = match self.fs.read_to_string(&path) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = ?path, error = %e, "unreadable package.json; NPM has no tasks");
                return Vec::new();
            }
        };

        match scripts_from_package_json(&contents) {
            Some(scripts) => scripts,
            None => {
                debug!(path = ?path, "package.json is invalid or has no scripts");
                Vec::new()
            }
        }
    }

    fn start(&mut self, task: &str, project_dir: &Path, reporter: TaskReporter) {
        let invocation = Invocation::new(&self.program, ["run", task], project_dir);
        self.slot
            .launch(format!("{NPM_RUNNER_NAME}:{task}"), invocation, reporter);
    }

    fn kill(&mut self) {
        self.slot.kill(NPM_RUNNER_NAME);
    }
}

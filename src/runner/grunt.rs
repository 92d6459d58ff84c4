// src/runner/grunt.rs

//! `grunt <task>` for the tasks registered in the project's Gruntfile.
//!
//! Tasks are discovered statically: every `registerTask` /
//! `registerMultiTask` call in the Gruntfile names one task. Tasks that only
//! come from loaded plugins are not listed, which keeps the list to the tasks
//! the project itself defines.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use regex::Regex;
use tracing::{debug, warn};

use crate::fs::FileSystem;

use super::process::{Invocation, ProcessSlot};
use super::{TaskReporter, TaskRunner};

pub const GRUNT_RUNNER_NAME: &str = "Grunt";
pub const GRUNTFILES: [&str; 2] = ["Gruntfile.js", "Gruntfile.coffee"];

// Matches both `grunt.registerTask('name', ...)` and the CoffeeScript
// `grunt.registerTask 'name', ...` form.
const REGISTER_TASK_PATTERN: &str = r#"register(?:Multi)?Task\s*\(?\s*['"]([^'"]+)['"]"#;

#[derive(Debug)]
pub struct GruntRunner {
    fs: Arc<dyn FileSystem>,
    program: String,
    register_task: Regex,
    slot: ProcessSlot,
}

impl GruntRunner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Result<Self> {
        let register_task =
            Regex::new(REGISTER_TASK_PATTERN).context("compiling Gruntfile task pattern")?;
        let program = if cfg!(windows) { "grunt.cmd" } else { "grunt" };
        Ok(Self {
            fs,
            program: program.to_string(),
            register_task,
            slot: ProcessSlot::new(),
        })
    }

    /// Override the `grunt` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Task names registered in a Gruntfile, in order, without duplicates.
    pub fn tasks_from_gruntfile(&self, contents: &str) -> Vec<String> {
        let mut tasks: Vec<String> = Vec::new();
        for caps in self.register_task.captures_iter(contents) {
            let name = caps[1].trim();
            if !name.is_empty() && !tasks.iter().any(|t| t == name) {
                tasks.push(name.to_string());
            }
        }
        tasks
    }
}

impl TaskRunner for GruntRunner {
    fn name(&self) -> &str {
        GRUNT_RUNNER_NAME
    }

    fn list_tasks(&self, project_dir: &Path) -> Vec<String> {
        let Some(path) = GRUNTFILES
            .iter()
            .map(|f| project_dir.join(f))
            .find(|p| self.fs.is_file(p))
        else {
            debug!(dir = ?project_dir, "no Gruntfile; Grunt has no tasks");
            return Vec::new();
        };

        match self.fs.read_to_string(&path) {
            Ok(contents) => self.tasks_from_gruntfile(&contents),
            Err(e) => {
                warn!(path = ?path, error = %e, "unreadable Gruntfile; Grunt has no tasks");
                Vec::new()
            }
        }
    }

    fn start(&mut self, task: &str, project_dir: &Path, reporter: TaskReporter) {
        let invocation = Invocation::new(&self.program, [task], project_dir);
        self.slot
            .launch(format!("{GRUNT_RUNNER_NAME}:{task}"), invocation, reporter);
    }

    fn kill(&mut self) {
        self.slot.kill(GRUNT_RUNNER_NAME);
    }
}

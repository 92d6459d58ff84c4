// src/runner/mod.rs

//! Task runners.
//!
//! A runner exposes the named tasks of one external tool and can start and
//! stop one invocation at a time.
//!
//! - [`reporter`] is how a runner reports output and its terminal outcome.
//! - [`process`] holds the process plumbing shared by the concrete runners.
//! - [`npm`], [`grunt`] and [`command`] are the concrete runners.

pub mod command;
pub mod grunt;
pub mod npm;
pub mod process;
pub mod reporter;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::engine::TaskListing;
use crate::errors::Result;
use crate::fs::FileSystem;

pub use command::CommandRunner;
pub use grunt::{GruntRunner, GRUNT_RUNNER_NAME};
pub use npm::{NpmRunner, NPM_RUNNER_NAME};
pub use reporter::{OutputSink, TaskReporter};

/// Names reserved by the built-in runners.
pub const BUILTIN_RUNNERS: [&str; 2] = [NPM_RUNNER_NAME, GRUNT_RUNNER_NAME];

/// Capability every task source implements.
///
/// Contract:
/// - `name` is stable and never empty.
/// - `list_tasks` never fails; a missing or broken tool configuration is an
///   empty list.
/// - `start` begins exactly one invocation and eventually consumes the
///   reporter with [`TaskReporter::finish`], exactly once.
/// - `kill` terminates the in-flight invocation; the reporter of that
///   invocation must still be finished (with `false`).
pub trait TaskRunner: Send {
    fn name(&self) -> &str;

    fn list_tasks(&self, project_dir: &Path) -> Vec<String>;

    fn start(&mut self, task: &str, project_dir: &Path, reporter: TaskReporter);

    fn kill(&mut self);
}

/// Runners by name, fixed once the orchestrator owns it.
#[derive(Default)]
pub struct RunnerRegistry {
    runners: BTreeMap<String, Box<dyn TaskRunner>>,
}

impl fmt::Debug for RunnerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerRegistry")
            .field("runners", &self.runners.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl RunnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in runners plus the command runners from the config, minus the
    /// disabled ones.
    pub fn from_config(cfg: &ConfigFile, fs: Arc<dyn FileSystem>) -> Result<Self> {
        let mut registry = Self::new();

        if cfg.is_runner_enabled(NPM_RUNNER_NAME) {
            registry = registry.with_runner(Box::new(NpmRunner::new(fs.clone())));
        }
        if cfg.is_runner_enabled(GRUNT_RUNNER_NAME) {
            registry = registry.with_runner(Box::new(GruntRunner::new(fs.clone())?));
        }
        for (name, runner_cfg) in cfg.runners.iter() {
            if cfg.is_runner_enabled(name) {
                registry = registry
                    .with_runner(Box::new(CommandRunner::new(name, runner_cfg.tasks.clone())));
            }
        }

        debug!(runners = ?registry.names().collect::<Vec<_>>(), "runner registry built");
        Ok(registry)
    }

    /// Register a runner under its `name()`. A later runner with the same
    /// name replaces the earlier one.
    pub fn with_runner(mut self, runner: Box<dyn TaskRunner>) -> Self {
        let name = runner.name().to_string();
        if name.is_empty() {
            warn!("refusing to register a runner with an empty name");
            return self;
        }
        if self.runners.insert(name.clone(), runner).is_some() {
            warn!(runner = %name, "runner registered twice; keeping the latest");
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.runners.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.runners.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.runners.is_empty()
    }

    /// Current tasks of every runner, omitting runners without tasks.
    pub fn tasks(&self, project_dir: &Path) -> TaskListing {
        self.runners
            .iter()
            .filter_map(|(name, runner)| {
                let tasks = runner.list_tasks(project_dir);
                if tasks.is_empty() {
                    None
                } else {
                    Some((name.clone(), tasks))
                }
            })
            .collect()
    }

    /// Start `task` on `runner`. An unknown runner drops the reporter, which
    /// reports failure.
    pub fn start(&mut self, runner: &str, task: &str, project_dir: &Path, reporter: TaskReporter) {
        match self.runners.get_mut(runner) {
            Some(r) => r.start(task, project_dir, reporter),
            None => warn!(runner, task, "start requested for unknown runner"),
        }
    }

    pub fn kill(&mut self, runner: &str) {
        match self.runners.get_mut(runner) {
            Some(r) => r.kill(),
            None => warn!(runner, "kill requested for unknown runner"),
        }
    }
}

// src/types.rs

use std::fmt;
use std::path::{Path, PathBuf};

/// Immutable triple naming one task of one runner within one project.
///
/// Used both as the duration-store key and as the orchestrator's
/// "currently running" identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskIdentity {
    pub project: String,
    pub runner: String,
    pub task: String,
}

impl TaskIdentity {
    pub fn new(
        project: impl Into<String>,
        runner: impl Into<String>,
        task: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            runner: runner.into(),
            task: task.into(),
        }
    }
}

impl fmt::Display for TaskIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.project, self.runner, self.task)
    }
}

/// One progress update for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Known-duration mode, 0..=100.
    Percent(u8),
    /// Indeterminate mode: index of the spinner frame to render.
    Frame(usize),
}

/// The project the orchestrator operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectContext {
    pub dir: PathBuf,
    pub key: String,
}

impl ProjectContext {
    /// Build a context whose key is the basename of `dir`, unless an explicit
    /// key is given.
    pub fn new(dir: impl Into<PathBuf>, key: Option<String>) -> Self {
        let dir = dir.into();
        let key = key.unwrap_or_else(|| project_key_for(&dir));
        Self { dir, key }
    }

    pub fn identity(&self, runner: &str, task: &str) -> TaskIdentity {
        TaskIdentity::new(self.key.clone(), runner, task)
    }
}

fn project_key_for(dir: &Path) -> String {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(|s| s.to_string())
        .unwrap_or_else(|| dir.display().to_string())
}

// src/store/mod.rs

//! Persistent duration estimates.
//!
//! The backing document is a single JSON object shaped as
//!
//! ```json
//! { "<project>": { "<runner>": { "<task>": 1234 } } }
//! ```
//!
//! where the leaf is the duration in milliseconds of the last successful run.
//! Several processes may share one document, so every write re-reads the file,
//! merges the new value in and writes the whole document back.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::errors::StoreError;
use crate::fs::FileSystem;
use crate::types::TaskIdentity;

/// Default location of the store, relative to the project directory.
pub const DEFAULT_STORE_PATH: &str = ".taskpulse/durations.json";

/// project -> runner -> task -> duration in milliseconds.
pub type DurationRecord = BTreeMap<String, BTreeMap<String, BTreeMap<String, u64>>>;

#[derive(Debug)]
pub struct DurationStore {
    fs: Arc<dyn FileSystem>,
    path: PathBuf,
    data: DurationRecord,
}

impl DurationStore {
    /// Open the store at `path`, loading its current contents.
    ///
    /// A missing file is an empty store. An unreadable or unparseable file is
    /// an error.
    pub fn open(fs: Arc<dyn FileSystem>, path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = read_document(fs.as_ref(), &path)?;
        debug!(path = ?path, projects = data.len(), "opened duration store");
        Ok(Self { fs, path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Last successful duration for the task, if one was ever recorded.
    pub fn get_duration(&self, project: &str, runner: &str, task: &str) -> Option<u64> {
        self.data
            .get(project)
            .and_then(|runners| runners.get(runner))
            .and_then(|tasks| tasks.get(task))
            .copied()
    }

    /// Convenience wrapper around [`get_duration`](Self::get_duration).
    pub fn estimate_for(&self, id: &TaskIdentity) -> Option<Duration> {
        self.get_duration(&id.project, &id.runner, &id.task)
            .map(Duration::from_millis)
    }

    /// Record a duration: re-read the document, merge, write it back.
    pub fn set_duration(
        &mut self,
        project: &str,
        runner: &str,
        task: &str,
        millis: u64,
    ) -> Result<(), StoreError> {
        let mut data = read_document(self.fs.as_ref(), &self.path)?;
        data.entry(project.to_string())
            .or_default()
            .entry(runner.to_string())
            .or_default()
            .insert(task.to_string(), millis);

        let json = serde_json::to_string_pretty(&data).map_err(|source| StoreError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        self.fs
            .write(&self.path, json.as_bytes())
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        self.data = data;
        info!(project, runner, task, millis, "stored task duration");
        Ok(())
    }

    pub fn record(&mut self, id: &TaskIdentity, elapsed: Duration) -> Result<(), StoreError> {
        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.set_duration(&id.project, &id.runner, &id.task, millis)
    }

    /// Re-read the backing document, picking up writes from other processes.
    pub fn reload(&mut self) -> Result<(), StoreError> {
        self.data = read_document(self.fs.as_ref(), &self.path)?;
        Ok(())
    }

    /// All recorded durations of one project, keyed by runner then task.
    pub fn project_durations(&self, project: &str) -> BTreeMap<String, BTreeMap<String, u64>> {
        self.data.get(project).cloned().unwrap_or_default()
    }
}

fn read_document(fs: &dyn FileSystem, path: &Path) -> Result<DurationRecord, StoreError> {
    if !fs.exists(path) {
        return Ok(DurationRecord::new());
    }

    let contents = fs.read_to_string(path).map_err(|source| StoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if contents.trim().is_empty() {
        return Ok(DurationRecord::new());
    }

    serde_json::from_str(&contents).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::ProgressSettings;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// project_key = "my-app"
/// indeterminate_interval = "30ms"
/// watchdog_timeout = "30m"
///
/// [runner.Make.tasks]
/// build = "make build"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    /// Global behaviour from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// User-defined command runners from `[runner.<name>]`.
    #[serde(default)]
    pub runner: BTreeMap<String, RunnerConfig>,
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Key under which durations are stored. Defaults to the basename of the
    /// project directory.
    #[serde(default)]
    pub project_key: Option<String>,

    /// Duration store location, relative to the project directory unless
    /// absolute.
    #[serde(default = "default_store_path")]
    pub store_path: String,

    /// Tick interval of the indeterminate spinner.
    #[serde(default = "default_indeterminate_interval")]
    pub indeterminate_interval: String,

    /// Number of spinner frames before the index wraps.
    #[serde(default = "default_indeterminate_frames")]
    pub indeterminate_frames: usize,

    /// Cadence of the fast-forward animation after a task finishes early.
    #[serde(default = "default_fast_forward_interval")]
    pub fast_forward_interval: String,

    /// Give up on a run whose runner never reports back. Off when absent.
    #[serde(default)]
    pub watchdog_timeout: Option<String>,

    /// Runners that should not be registered at all.
    #[serde(default)]
    pub disabled_runners: Vec<String>,
}

fn default_store_path() -> String {
    crate::store::DEFAULT_STORE_PATH.to_string()
}

fn default_indeterminate_interval() -> String {
    "30ms".to_string()
}

fn default_indeterminate_frames() -> usize {
    32
}

fn default_fast_forward_interval() -> String {
    "1ms".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            project_key: None,
            store_path: default_store_path(),
            indeterminate_interval: default_indeterminate_interval(),
            indeterminate_frames: default_indeterminate_frames(),
            fast_forward_interval: default_fast_forward_interval(),
            watchdog_timeout: None,
            disabled_runners: Vec::new(),
        }
    }
}

/// `[runner.<name>]` section: a runner whose tasks are plain shell commands.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RunnerConfig {
    /// Task name -> command line.
    #[serde(default)]
    pub tasks: BTreeMap<String, String>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project_key: Option<String>,
    pub store_path: PathBuf,
    pub progress: ProgressSettings,
    pub disabled_runners: Vec<String>,
    pub runners: BTreeMap<String, RunnerConfig>,
}

impl ConfigFile {
    /// Construct without validation. Prefer `ConfigFile::try_from(raw)`.
    pub fn new_unchecked(
        project_key: Option<String>,
        store_path: PathBuf,
        progress: ProgressSettings,
        disabled_runners: Vec<String>,
        runners: BTreeMap<String, RunnerConfig>,
    ) -> Self {
        Self {
            project_key,
            store_path,
            progress,
            disabled_runners,
            runners,
        }
    }

    pub fn is_runner_enabled(&self, name: &str) -> bool {
        !self.disabled_runners.iter().any(|d| d == name)
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            project_key: None,
            store_path: PathBuf::from(crate::store::DEFAULT_STORE_PATH),
            progress: ProgressSettings::default(),
            disabled_runners: Vec::new(),
            runners: BTreeMap::new(),
        }
    }
}

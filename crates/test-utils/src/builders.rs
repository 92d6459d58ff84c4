use std::collections::BTreeMap;

use taskpulse::config::{ConfigFile, ConfigSection, RawConfigFile, RunnerConfig};

/// Builder for a raw config that the tests then validate.
///
/// Starts from the defaults every `[config]` key has when omitted.
#[derive(Debug, Clone, Default)]
pub struct ConfigFileBuilder {
    config: ConfigSection,
    runners: BTreeMap<String, RunnerConfig>,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_key(mut self, key: &str) -> Self {
        self.config.project_key = Some(key.to_string());
        self
    }

    pub fn store_path(mut self, path: &str) -> Self {
        self.config.store_path = path.to_string();
        self
    }

    pub fn watchdog(mut self, timeout: &str) -> Self {
        self.config.watchdog_timeout = Some(timeout.to_string());
        self
    }

    pub fn indeterminate_frames(mut self, frames: usize) -> Self {
        self.config.indeterminate_frames = frames;
        self
    }

    pub fn disable(mut self, runner: &str) -> Self {
        self.config.disabled_runners.push(runner.to_string());
        self
    }

    /// Add a command runner with `(task, command)` pairs.
    pub fn command_runner(mut self, name: &str, tasks: &[(&str, &str)]) -> Self {
        let tasks = tasks
            .iter()
            .map(|(t, c)| (t.to_string(), c.to_string()))
            .collect();
        self.runners.insert(name.to_string(), RunnerConfig { tasks });
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        RawConfigFile {
            config: self.config,
            runner: self.runners,
        }
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.build_raw()).expect("builder produced an invalid config")
    }
}

// src/config/validate.rs

use std::path::PathBuf;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{ConfigFile, RawConfigFile};
use crate::engine::ProgressSettings;
use crate::errors::{Result, TaskpulseError};
use crate::runner::BUILTIN_RUNNERS;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskpulseError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_runners(&raw)?;
        validate_disabled_runners(&raw)?;
        let progress = progress_settings(&raw)?;

        if raw.config.store_path.trim().is_empty() {
            return Err(TaskpulseError::ConfigError(
                "[config].store_path must not be empty".to_string(),
            ));
        }
        let project_key = match raw.config.project_key {
            Some(key) if key.trim().is_empty() => {
                return Err(TaskpulseError::ConfigError(
                    "[config].project_key must not be empty when given".to_string(),
                ));
            }
            other => other,
        };

        Ok(ConfigFile::new_unchecked(
            project_key,
            PathBuf::from(raw.config.store_path),
            progress,
            raw.config.disabled_runners,
            raw.runner,
        ))
    }
}

fn progress_settings(cfg: &RawConfigFile) -> Result<ProgressSettings> {
    let section = &cfg.config;

    if section.indeterminate_frames == 0 {
        return Err(TaskpulseError::ConfigError(
            "[config].indeterminate_frames must be >= 1 (got 0)".to_string(),
        ));
    }

    let watchdog = section
        .watchdog_timeout
        .as_deref()
        .map(|s| non_zero_duration("watchdog_timeout", s))
        .transpose()?;

    Ok(ProgressSettings {
        indeterminate_interval: non_zero_duration(
            "indeterminate_interval",
            &section.indeterminate_interval,
        )?,
        indeterminate_frames: section.indeterminate_frames,
        fast_forward_interval: non_zero_duration(
            "fast_forward_interval",
            &section.fast_forward_interval,
        )?,
        watchdog,
    })
}

fn non_zero_duration(field: &str, value: &str) -> Result<Duration> {
    let dur = parse_duration(value)
        .map_err(|e| TaskpulseError::ConfigError(format!("[config].{field}: {e}")))?;
    if dur.is_zero() {
        return Err(TaskpulseError::ConfigError(format!(
            "[config].{field} must be greater than zero (got '{value}')"
        )));
    }
    Ok(dur)
}

fn validate_runners(cfg: &RawConfigFile) -> Result<()> {
    for (name, runner) in cfg.runner.iter() {
        if name.trim().is_empty() {
            return Err(TaskpulseError::ConfigError(
                "runner names must not be empty".to_string(),
            ));
        }
        if BUILTIN_RUNNERS.contains(&name.as_str()) {
            return Err(TaskpulseError::ConfigError(format!(
                "runner '{}' collides with a built-in runner",
                name
            )));
        }
        if runner.tasks.is_empty() {
            return Err(TaskpulseError::ConfigError(format!(
                "runner '{}' must define at least one task in [runner.{}.tasks]",
                name, name
            )));
        }
        for (task, cmd) in runner.tasks.iter() {
            if task.trim().is_empty() {
                return Err(TaskpulseError::ConfigError(format!(
                    "runner '{}' has a task with an empty name",
                    name
                )));
            }
            if cmd.trim().is_empty() {
                return Err(TaskpulseError::ConfigError(format!(
                    "task '{}' of runner '{}' has an empty command",
                    task, name
                )));
            }
        }
    }
    Ok(())
}

fn validate_disabled_runners(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.config.disabled_runners.iter() {
        let known = BUILTIN_RUNNERS.contains(&name.as_str()) || cfg.runner.contains_key(name);
        if !known {
            return Err(TaskpulseError::ConfigError(format!(
                "[config].disabled_runners names unknown runner '{}'",
                name
            )));
        }
    }
    Ok(())
}

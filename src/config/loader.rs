// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TaskpulseError};

/// File name looked up in the project directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "Taskpulse.toml";

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it into a `ConfigFile`.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Load the project's config, falling back to defaults when the default file
/// does not exist.
///
/// An explicitly requested path must exist.
pub fn load_or_default(explicit: Option<&Path>, project_dir: &Path) -> Result<ConfigFile> {
    if let Some(path) = explicit {
        if !path.is_file() {
            return Err(TaskpulseError::ConfigError(format!(
                "config file {:?} does not exist",
                path
            )));
        }
        return load_and_validate(path);
    }

    let path = default_config_path(project_dir);
    if path.is_file() {
        debug!(path = ?path, "loading project config");
        load_and_validate(&path)
    } else {
        debug!(path = ?path, "no project config; using defaults");
        ConfigFile::try_from(RawConfigFile::default())
    }
}

/// `Taskpulse.toml` inside the project directory.
pub fn default_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(DEFAULT_CONFIG_FILE)
}

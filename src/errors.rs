// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TaskpulseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("orchestrator is no longer running")]
    OrchestratorGone,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Failures of the duration store's backing document.
///
/// All of these are fatal for the orchestrator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("reading duration store at {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("parsing duration store at {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("serializing duration store for {path:?}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("writing duration store at {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskpulseError>;

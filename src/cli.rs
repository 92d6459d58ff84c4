// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Command-line arguments for `taskpulse`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskpulse",
    version,
    about = "Run project tasks one at a time with progress learned from previous runs.",
    long_about = None
)]
pub struct CliArgs {
    /// Project directory. Default: the current working directory.
    #[arg(long, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Taskpulse.toml` in the project directory, if present.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKPULSE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the available tasks of every runner.
    List,
    /// Run one task with live progress and exit when it finishes.
    ///
    /// Ctrl-C kills the task.
    Run {
        /// Runner name, e.g. `NPM`.
        runner: String,
        /// Task name, e.g. `build`.
        task: String,
    },
    /// Read `<runner> <task>` lines from stdin; each line starts the task or,
    /// if it is the one running, kills it. Also accepts `list`, `status` and
    /// `quit`.
    Interactive,
    /// Print the stored duration estimates of the project.
    Estimates,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

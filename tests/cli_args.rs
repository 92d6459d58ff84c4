// tests/cli_args.rs

use std::path::PathBuf;

use clap::Parser;
use taskpulse::cli::{CliArgs, Command};

#[test]
fn run_subcommand_takes_runner_and_task() {
    let args = CliArgs::try_parse_from([
        "taskpulse",
        "--project",
        "/srv/app",
        "--log-level",
        "debug",
        "run",
        "NPM",
        "build",
    ])
    .unwrap();

    assert_eq!(args.project, Some(PathBuf::from("/srv/app")));
    assert!(args.log_level.is_some());
    match args.command {
        Command::Run { runner, task } => {
            assert_eq!(runner, "NPM");
            assert_eq!(task, "build");
        }
        other => panic!("expected run, got {other:?}"),
    }
}

#[test]
fn subcommand_is_required() {
    assert!(CliArgs::try_parse_from(["taskpulse"]).is_err());
    assert!(CliArgs::try_parse_from(["taskpulse", "run", "NPM"]).is_err());
}

#[test]
fn simple_subcommands_parse() {
    let parse = |word: &str| CliArgs::try_parse_from(["taskpulse", word]).unwrap().command;
    assert!(matches!(parse("list"), Command::List));
    assert!(matches!(parse("interactive"), Command::Interactive));
    assert!(matches!(parse("estimates"), Command::Estimates));
}

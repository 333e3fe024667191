// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `multirun`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "multirun",
    version,
    about = "Run a generated set of commands serially or in parallel.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the instructions file (JSON).
    ///
    /// Default: the file next to the running executable, named after it with
    /// a `.json` suffix.
    #[arg(short = 'f', long, value_name = "PATH")]
    pub instructions: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `MULTIRUN_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Load and resolve the instructions, print the plan, but don't execute
    /// any commands.
    #[arg(long)]
    pub dry_run: bool,

    /// Extra arguments appended to every command.
    #[arg(last = true, value_name = "ARGS")]
    pub args: Vec<String>,
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

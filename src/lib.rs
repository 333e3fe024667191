// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod output;
pub mod resolve;
pub mod signal;
pub mod types;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{
    default_instructions_path, load_and_validate, InstructionSet, ProcessSelfLocator, SelfLocator,
};
use crate::engine::{CancelToken, Engine};
use crate::exec::ProcessRunner;
use crate::fs::RealFileSystem;
use crate::output::OutputSink;
use crate::resolve::{InterpreterRewrite, ResolvedCommand, Resolver, Runfiles, RunfilesEnv};
use crate::signal::{spawn_listener, SignalBridge};
use crate::types::ExecutionMode;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - instruction loading (explicit path or self-located)
/// - runfiles discovery and eager command resolution
/// - the engine with the real process runner and terminal output
/// - SIGINT/SIGTERM handling
///
/// Returns the process exit code for the run.
pub async fn run(args: CliArgs) -> Result<i32> {
    let locator = ProcessSelfLocator;
    let instructions_path = match &args.instructions {
        Some(path) => path.clone(),
        None => default_instructions_path(&locator)?,
    };
    info!(path = %instructions_path.display(), "loading instructions");

    let set = load_and_validate(&instructions_path)?;

    let fs = RealFileSystem;
    let runfiles = Runfiles::discover(&fs, &RunfilesEnv::from_process(locator.current_exe().ok()))?;
    let resolver = Resolver::new(&fs, runfiles, set.policy.workspace_root.clone())
        .with_rewrite(InterpreterRewrite::bash_scripts());
    let commands = resolver.resolve_all(&set.commands, &args.args)?;

    if args.dry_run {
        print_dry_run(&instructions_path, &set, &commands);
        return Ok(0);
    }

    let cancel = CancelToken::new();
    let bridge = SignalBridge::new(cancel.clone());
    let listener = spawn_listener(bridge.clone());

    let engine = Engine::new(
        set.policy.clone(),
        ProcessRunner,
        Arc::new(OutputSink::terminal()),
        cancel,
    );
    let summary = engine.run(commands).await;
    listener.abort();

    if bridge.fired() {
        eprintln!(
            "multirun: interrupted; {} command(s) were not started",
            summary.cancelled_count()
        );
    }

    let code = summary.exit_code_with_interrupt(bridge.fired());
    debug!(code, "run complete");
    Ok(code)
}

/// Print the resolved plan without running anything.
fn print_dry_run(path: &Path, set: &InstructionSet, commands: &[ResolvedCommand]) {
    let policy = &set.policy;

    println!("multirun dry-run");
    println!("  instructions = {}", path.display());
    println!("  mode = {}", ExecutionMode::from_jobs(policy.jobs));
    println!("  print_command = {}", policy.tag_output);
    println!("  buffer_output = {}", policy.buffer_output);
    println!("  stop_on_error = {}", policy.stop_on_error);
    if !policy.workspace_root.is_empty() {
        println!("  workspace_root = {}", policy.workspace_root);
    }
    println!();

    println!("commands ({}):", commands.len());
    for command in commands {
        println!("  - {}", command.tag);
        println!("      program: {}", command.program.display());
        if !command.args.is_empty() {
            println!("      args: {:?}", command.args);
        }
        for (key, value) in &command.env {
            println!("      env: {key}={value}");
        }
    }

    debug!("dry-run complete (no execution)");
}

// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The engine talks to a `CommandRunner` instead of spawning processes
//! itself. This keeps the scheduling strategies testable with a fake runner
//! while production uses [`ProcessRunner`].

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::engine::CommandStatus;
use crate::output::OutputSink;
use crate::resolve::ResolvedCommand;
use crate::types::StdinMode;

use super::task_runner::run_process;

/// Where a child's stdout/stderr go.
#[derive(Debug, Clone)]
pub enum OutputRoute {
    /// Straight to the process's own stdout/stderr.
    Inherit,
    /// Line by line through the sink.
    Forward(Arc<OutputSink>),
    /// Collected in memory and returned with the outcome.
    Capture,
}

/// I/O wiring for one command.
#[derive(Debug, Clone)]
pub struct RunIo {
    pub stdin: StdinMode,
    pub output: OutputRoute,
}

/// What a runner reports back for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutcome {
    pub status: CommandStatus,
    /// Present when the route was [`OutputRoute::Capture`].
    pub output: Option<Vec<u8>>,
}

/// Trait abstracting how a resolved command is executed.
///
/// Implementations must not fail: spawn problems are reported as
/// [`CommandStatus::SpawnFailed`] so the engine can count them as that
/// command's failure.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(
        &'a self,
        command: &'a ResolvedCommand,
        io: &'a RunIo,
    ) -> Pin<Box<dyn Future<Output = CommandOutcome> + Send + 'a>>;
}

/// Runner that spawns real OS processes with `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    fn run<'a>(
        &'a self,
        command: &'a ResolvedCommand,
        io: &'a RunIo,
    ) -> Pin<Box<dyn Future<Output = CommandOutcome> + Send + 'a>> {
        Box::pin(run_process(command, io))
    }
}

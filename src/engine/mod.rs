// src/engine/mod.rs

//! Execution engine for multirun.
//!
//! This module ties together:
//! - the scheduling strategies (serial, unbounded, bounded pool) in
//!   [`scheduler`]
//! - the run-wide cancellation token in [`cancel`]
//! - the pure reduction of per-command results in [`summary`]
//!
//! Every command produces exactly one [`RunResult`]; the overall outcome is
//! computed from those results after all workers have finished.

use std::fmt;

use crate::resolve::ResolvedCommand;

/// What happened to one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// The process ran and exited with this code (-1 when killed by a signal).
    Exited(i32),
    /// The process could not be started.
    SpawnFailed(String),
    /// The command never started because the run was cancelled.
    Cancelled,
}

impl CommandStatus {
    pub fn succeeded(&self) -> bool {
        matches!(self, CommandStatus::Exited(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            CommandStatus::Exited(code) => Some(*code),
            CommandStatus::SpawnFailed(_) | CommandStatus::Cancelled => None,
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandStatus::Exited(code) => write!(f, "exited with {code}"),
            CommandStatus::SpawnFailed(reason) => write!(f, "failed to start: {reason}"),
            CommandStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Result reported for one command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    pub index: usize,
    pub tag: String,
    pub status: CommandStatus,
    /// Combined stdout + stderr, only captured in buffered mode.
    pub output: Option<Vec<u8>>,
}

impl RunResult {
    pub fn cancelled(command: &ResolvedCommand) -> Self {
        Self {
            index: command.index,
            tag: command.tag.clone(),
            status: CommandStatus::Cancelled,
            output: None,
        }
    }
}

/// Lifecycle of an engine run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

pub mod cancel;
pub mod scheduler;
pub mod summary;

pub use cancel::CancelToken;
pub use scheduler::Engine;
pub use summary::RunSummary;

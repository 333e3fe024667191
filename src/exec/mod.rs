// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the resolved commands,
//! using `tokio::process::Command`, and reporting one outcome per command
//! back to the engine.
//!
//! - [`backend`] provides the `CommandRunner` trait and the production
//!   `ProcessRunner`, which tests can replace with a fake implementation.
//! - [`task_runner`] handles individual process execution and stdin/output
//!   wiring.

pub mod backend;
pub mod task_runner;

pub use backend::{CommandOutcome, CommandRunner, OutputRoute, ProcessRunner, RunIo};

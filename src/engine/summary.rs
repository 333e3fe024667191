// src/engine/summary.rs

//! Aggregation of per-command results.
//!
//! This is a pure reduction over the results the workers reported; it has no
//! Tokio types and no shared state, and runs once every worker is done.

use super::{CommandStatus, EngineState, RunResult};

/// Exit code for failures that have no usable process status of their own.
pub const INTERNAL_FAILURE_CODE: i32 = 1;

#[derive(Debug, Clone)]
pub struct RunSummary {
    /// In the order they were reported: list order for serial runs,
    /// completion order for concurrent runs.
    results: Vec<RunResult>,
    cancelled: bool,
}

impl RunSummary {
    pub fn new(results: Vec<RunResult>, cancelled: bool) -> Self {
        Self { results, cancelled }
    }

    pub fn results(&self) -> &[RunResult] {
        &self.results
    }

    pub fn result_for(&self, index: usize) -> Option<&RunResult> {
        self.results.iter().find(|r| r.index == index)
    }

    /// True when every command ran and exited with 0.
    pub fn success(&self) -> bool {
        self.results.iter().all(|r| r.status.succeeded())
    }

    /// First failure in report order, ignoring cancellations.
    ///
    /// For concurrent runs report order is completion order, so which
    /// failure comes first is not deterministic when several commands fail.
    pub fn first_failure(&self) -> Option<&RunResult> {
        self.results
            .iter()
            .find(|r| !r.status.succeeded() && r.status != CommandStatus::Cancelled)
    }

    pub fn cancelled_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == CommandStatus::Cancelled)
            .count()
    }

    /// Whether the cancellation token was set when the run ended.
    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn final_state(&self) -> EngineState {
        if self.cancelled {
            EngineState::Cancelled
        } else {
            EngineState::Completed
        }
    }

    /// Process exit code for the whole run.
    ///
    /// The first failure's exit code wins. Spawn failures and codes that
    /// cannot be a process status (signal deaths report -1) become 1, as does
    /// a run where nothing failed but some command never ran.
    pub fn exit_code(&self) -> i32 {
        match self.first_failure().map(|r| &r.status) {
            Some(CommandStatus::Exited(code)) if (1..=255).contains(code) => *code,
            Some(_) => INTERNAL_FAILURE_CODE,
            None if self.cancelled_count() > 0 => INTERNAL_FAILURE_CODE,
            None => 0,
        }
    }

    /// Exit code once an interrupt is taken into account: a signal-triggered
    /// shutdown never reports success, even if nothing was left to cancel.
    pub fn exit_code_with_interrupt(&self, interrupted: bool) -> i32 {
        match self.exit_code() {
            0 if interrupted => INTERNAL_FAILURE_CODE,
            code => code,
        }
    }
}

// src/engine/scheduler.rs

use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ExecutionPolicy;
use crate::exec::{CommandRunner, OutputRoute, RunIo};
use crate::output::OutputSink;
use crate::resolve::ResolvedCommand;
use crate::types::{ExecutionMode, StdinMode};

use super::cancel::CancelToken;
use super::summary::RunSummary;
use super::{CommandStatus, EngineState, RunResult};

/// Runs a list of resolved commands under an [`ExecutionPolicy`].
///
/// The strategy is picked from `policy.jobs`:
/// - serial: list order, one at a time, children read the parent's stdin
/// - unbounded: everything launched at once
/// - bounded: `jobs` workers pulling from a shared FIFO queue
///
/// Cancellation is cooperative. Once the token is set no further command
/// starts; commands already running are waited for, never killed.
pub struct Engine<R: CommandRunner + 'static> {
    shared: Arc<Shared<R>>,
    state: Mutex<EngineState>,
}

/// State every worker needs. Lives behind an `Arc` so spawned tasks can own
/// a handle to it.
struct Shared<R> {
    runner: R,
    sink: Arc<OutputSink>,
    policy: ExecutionPolicy,
    cancel: CancelToken,
}

impl<R: CommandRunner + 'static> fmt::Debug for Engine<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("policy", &self.shared.policy)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<R: CommandRunner + 'static> Engine<R> {
    pub fn new(policy: ExecutionPolicy, runner: R, sink: Arc<OutputSink>, cancel: CancelToken) -> Self {
        Self {
            shared: Arc::new(Shared {
                runner,
                sink,
                policy,
                cancel,
            }),
            state: Mutex::new(EngineState::Idle),
        }
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.state)
    }

    fn set_state(&self, state: EngineState) {
        *lock(&self.state) = state;
    }

    /// Execute every command and wait for all of them.
    ///
    /// Each command yields exactly one [`RunResult`], including commands
    /// that never started because the run was cancelled.
    pub async fn run(&self, commands: Vec<ResolvedCommand>) -> RunSummary {
        let mode = ExecutionMode::from_jobs(self.shared.policy.jobs);
        info!(
            %mode,
            commands = commands.len(),
            stop_on_error = self.shared.policy.stop_on_error,
            buffer_output = self.shared.policy.buffer_output,
            "engine run started"
        );
        self.set_state(EngineState::Running);

        let stdin = mode.stdin_mode();
        let results = match mode {
            ExecutionMode::Serial => self.run_serial(commands, stdin).await,
            ExecutionMode::Unbounded => self.run_unbounded(commands, stdin).await,
            ExecutionMode::Bounded(workers) => self.run_bounded(commands, workers, stdin).await,
        };

        let summary = RunSummary::new(results, self.shared.cancel.is_cancelled());
        self.set_state(summary.final_state());

        info!(
            state = ?summary.final_state(),
            exit_code = summary.exit_code(),
            cancelled = summary.cancelled_count(),
            "engine run finished"
        );
        summary
    }

    async fn run_serial(&self, commands: Vec<ResolvedCommand>, stdin: StdinMode) -> Vec<RunResult> {
        let mut results = Vec::with_capacity(commands.len());

        for command in &commands {
            if self.shared.cancel.is_cancelled() {
                debug!(tag = %command.tag, "run cancelled; skipping command");
                results.push(RunResult::cancelled(command));
                continue;
            }

            self.shared.announce(command);
            results.push(self.shared.execute(command, stdin).await);
        }

        results
    }

    async fn run_unbounded(&self, commands: Vec<ResolvedCommand>, stdin: StdinMode) -> Vec<RunResult> {
        let expected = expected_of(&commands);
        let (tx, rx) = mpsc::unbounded_channel();
        let mut handles = Vec::with_capacity(commands.len());

        for command in commands {
            if self.shared.cancel.is_cancelled() {
                let _ = tx.send(RunResult::cancelled(&command));
                continue;
            }

            // Announced here so the lines follow launch order.
            self.shared.announce(&command);

            let shared = Arc::clone(&self.shared);
            let tx = tx.clone();
            handles.push(tokio::spawn(async move {
                let result = shared.execute(&command, stdin).await;
                let _ = tx.send(result);
            }));
        }
        drop(tx);

        collect(rx, handles, expected).await
    }

    async fn run_bounded(
        &self,
        commands: Vec<ResolvedCommand>,
        workers: usize,
        stdin: StdinMode,
    ) -> Vec<RunResult> {
        let expected = expected_of(&commands);
        let workers = workers.min(commands.len());
        let queue = Arc::new(Mutex::new(commands.into_iter().collect::<VecDeque<_>>()));
        let (tx, rx) = mpsc::unbounded_channel();

        debug!(workers, "starting worker pool");

        let mut handles = Vec::with_capacity(workers);
        for worker in 0..workers {
            let shared = Arc::clone(&self.shared);
            let queue = Arc::clone(&queue);
            let tx = tx.clone();

            handles.push(tokio::spawn(async move {
                loop {
                    // Pop and announce under the queue lock so tag lines keep
                    // the order in which commands leave the queue.
                    let next = {
                        let mut queue = lock(&queue);
                        queue.pop_front().map(|command| {
                            let cancelled = shared.cancel.is_cancelled();
                            if !cancelled {
                                shared.announce(&command);
                            }
                            (command, cancelled)
                        })
                    };

                    let Some((command, cancelled)) = next else {
                        debug!(worker, "queue drained; worker exiting");
                        break;
                    };

                    let result = if cancelled {
                        RunResult::cancelled(&command)
                    } else {
                        shared.execute(&command, stdin).await
                    };

                    if tx.send(result).is_err() {
                        break;
                    }
                }
            }));
        }
        drop(tx);

        collect(rx, handles, expected).await
    }
}

impl<R: CommandRunner> Shared<R> {
    /// Streamed mode prints `Running <tag>` before the command starts.
    /// Buffered mode puts the tag line on the output block instead.
    fn announce(&self, command: &ResolvedCommand) {
        if self.policy.tag_output && !self.policy.buffer_output {
            self.sink.announce(&command.tag);
        }
    }

    fn output_route(&self) -> OutputRoute {
        if self.policy.buffer_output {
            OutputRoute::Capture
        } else if self.sink.inherits_streams() {
            OutputRoute::Inherit
        } else {
            OutputRoute::Forward(Arc::clone(&self.sink))
        }
    }

    async fn execute(&self, command: &ResolvedCommand, stdin: StdinMode) -> RunResult {
        let io = RunIo {
            stdin,
            output: self.output_route(),
        };

        debug!(tag = %command.tag, index = command.index, ?stdin, "executing command");
        let outcome = self.runner.run(command, &io).await;

        if let Some(output) = &outcome.output {
            self.sink.emit(
                &command.tag,
                outcome.status.exit_code(),
                output,
                self.policy.buffer_output,
                self.policy.tag_output,
            );
        }

        if !outcome.status.succeeded() {
            warn!(tag = %command.tag, status = %outcome.status, "command failed");
            if self.policy.stop_on_error && self.cancel.cancel() {
                info!(tag = %command.tag, "stopping remaining commands after failure");
            }
        }

        RunResult {
            index: command.index,
            tag: command.tag.clone(),
            status: outcome.status,
            output: outcome.output,
        }
    }
}

fn expected_of(commands: &[ResolvedCommand]) -> Vec<(usize, String)> {
    commands.iter().map(|c| (c.index, c.tag.clone())).collect()
}

/// Gather results in completion order until every sender is gone, then make
/// sure each expected command has exactly one result.
async fn collect(
    mut rx: mpsc::UnboundedReceiver<RunResult>,
    handles: Vec<JoinHandle<()>>,
    expected: Vec<(usize, String)>,
) -> Vec<RunResult> {
    let mut results = Vec::with_capacity(expected.len());
    while let Some(result) = rx.recv().await {
        results.push(result);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            warn!(error = %e, "worker task ended abnormally");
        }
    }

    // A panicking worker takes its command's result with it.
    let seen: HashSet<usize> = results.iter().map(|r| r.index).collect();
    for (index, tag) in expected {
        if !seen.contains(&index) {
            warn!(%tag, index, "no result reported for command");
            results.push(RunResult {
                index,
                tag,
                status: CommandStatus::SpawnFailed("worker task ended without a result".to_string()),
                output: None,
            });
        }
    }

    results
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use multirun::engine::{CancelToken, CommandStatus};
use multirun::exec::{CommandOutcome, CommandRunner, OutputRoute, RunIo};
use multirun::resolve::ResolvedCommand;
use multirun::types::StdinMode;

/// What the fake runner does for one tag.
#[derive(Debug, Clone, Default)]
pub struct Script {
    exit_code: i32,
    delay: Duration,
    output: Vec<u8>,
    spawn_error: Option<String>,
    hold_until: Option<CancelToken>,
}

impl Script {
    pub fn exit(code: i32) -> Self {
        Self {
            exit_code: code,
            ..Self::default()
        }
    }

    pub fn spawn_error(reason: &str) -> Self {
        Self {
            spawn_error: Some(reason.to_string()),
            ..Self::default()
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.delay = Duration::from_millis(ms);
        self
    }

    pub fn output(mut self, text: &str) -> Self {
        self.output = text.as_bytes().to_vec();
        self
    }

    /// Keep "running" until the token is cancelled.
    pub fn hold_until_cancelled(mut self, token: CancelToken) -> Self {
        self.hold_until = Some(token);
        self
    }
}

/// A fake runner that:
/// - looks up a [`Script`] by command tag (default: exit 0 immediately)
/// - records start/finish order, stdin routing and peak concurrency
/// - writes scripted output through the route the engine chose.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    started: Arc<Mutex<Vec<String>>>,
    finished: Arc<Mutex<Vec<String>>>,
    stdin_modes: Arc<Mutex<Vec<(String, StdinMode)>>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, tag: &str, script: Script) -> Self {
        self.scripts.lock().unwrap().insert(tag.to_string(), script);
        self
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    pub fn finished(&self) -> Vec<String> {
        self.finished.lock().unwrap().clone()
    }

    pub fn stdin_modes(&self) -> Vec<(String, StdinMode)> {
        self.stdin_modes.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn script_for(&self, tag: &str) -> Script {
        self.scripts
            .lock()
            .unwrap()
            .get(tag)
            .cloned()
            .unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(
        &'a self,
        command: &'a ResolvedCommand,
        io: &'a RunIo,
    ) -> Pin<Box<dyn Future<Output = CommandOutcome> + Send + 'a>> {
        Box::pin(async move {
            let script = self.script_for(&command.tag);

            if let Some(reason) = script.spawn_error {
                self.started.lock().unwrap().push(command.tag.clone());
                self.finished.lock().unwrap().push(command.tag.clone());
                return CommandOutcome {
                    status: CommandStatus::SpawnFailed(reason),
                    output: None,
                };
            }

            self.started.lock().unwrap().push(command.tag.clone());
            self.stdin_modes
                .lock()
                .unwrap()
                .push((command.tag.clone(), io.stdin));

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if !script.delay.is_zero() {
                tokio::time::sleep(script.delay).await;
            }
            if let Some(token) = &script.hold_until {
                token.cancelled().await;
            }

            let output = match &io.output {
                OutputRoute::Capture => Some(script.output.clone()),
                OutputRoute::Forward(sink) => {
                    if !script.output.is_empty() {
                        sink.write_stdout(&script.output);
                    }
                    None
                }
                OutputRoute::Inherit => None,
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.lock().unwrap().push(command.tag.clone());

            CommandOutcome {
                status: CommandStatus::Exited(script.exit_code),
                output,
            }
        })
    }
}

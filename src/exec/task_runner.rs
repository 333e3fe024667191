// src/exec/task_runner.rs

//! Individual command process runner.

use std::process::Stdio;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, info};

use crate::engine::CommandStatus;
use crate::output::OutputSink;
use crate::resolve::ResolvedCommand;
use crate::types::StdinMode;

use super::backend::{CommandOutcome, OutputRoute, RunIo};

/// Longest run of bytes forwarded as one write when no newline shows up.
const MAX_CHUNK: usize = 1024 * 1024;

/// Run a single command to completion.
///
/// Errors while starting or waiting for the process are logged and turned
/// into a [`CommandStatus::SpawnFailed`] outcome.
pub async fn run_process(command: &ResolvedCommand, io: &RunIo) -> CommandOutcome {
    match run_process_inner(command, io).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(
                tag = %command.tag,
                program = %command.program.display(),
                error = %err,
                "command execution error"
            );
            CommandOutcome {
                status: CommandStatus::SpawnFailed(format!("{err:#}")),
                output: None,
            }
        }
    }
}

async fn run_process_inner(command: &ResolvedCommand, io: &RunIo) -> Result<CommandOutcome> {
    info!(
        tag = %command.tag,
        program = %command.program.display(),
        args = ?command.args,
        "starting command process"
    );

    let mut cmd = Command::new(&command.program);
    cmd.args(&command.args);
    for (key, value) in &command.env {
        cmd.env(key, value);
    }

    cmd.stdin(match io.stdin {
        StdinMode::Inherit => Stdio::inherit(),
        StdinMode::Null => Stdio::null(),
    });

    match io.output {
        OutputRoute::Inherit => {
            cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
        }
        OutputRoute::Forward(_) | OutputRoute::Capture => {
            cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        }
    }

    // Only reached when the run itself is torn down; normal cancellation
    // lets running children finish.
    cmd.kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning process for command '{}'", command.tag))?;

    let captured = Arc::new(Mutex::new(Vec::new()));
    let mut pumps = Vec::new();

    if let Some(stdout) = child.stdout.take() {
        let target = PumpTarget::for_route(&io.output, Stream::Stdout, &captured);
        pumps.push(tokio::spawn(pump(stdout, target, command.tag.clone(), MAX_CHUNK)));
    }
    if let Some(stderr) = child.stderr.take() {
        let target = PumpTarget::for_route(&io.output, Stream::Stderr, &captured);
        pumps.push(tokio::spawn(pump(stderr, target, command.tag.clone(), MAX_CHUNK)));
    }

    let status = child
        .wait()
        .await
        .with_context(|| format!("waiting for process of command '{}'", command.tag))?;

    // Drain whatever the child wrote before exiting.
    for handle in pumps {
        if let Err(e) = handle.await {
            debug!(tag = %command.tag, error = %e, "output pump task failed");
        }
    }

    let code = status.code().unwrap_or(-1);
    info!(
        tag = %command.tag,
        exit_code = code,
        success = status.success(),
        "command process exited"
    );

    let output = match io.output {
        OutputRoute::Capture => {
            let mut buf = captured.lock().unwrap_or_else(|p| p.into_inner());
            Some(std::mem::take(&mut *buf))
        }
        OutputRoute::Inherit | OutputRoute::Forward(_) => None,
    };

    Ok(CommandOutcome {
        status: CommandStatus::Exited(code),
        output,
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

enum PumpTarget {
    Sink(Arc<OutputSink>, Stream),
    Buffer(Arc<Mutex<Vec<u8>>>),
}

impl PumpTarget {
    fn for_route(route: &OutputRoute, stream: Stream, captured: &Arc<Mutex<Vec<u8>>>) -> Self {
        match route {
            OutputRoute::Forward(sink) => PumpTarget::Sink(Arc::clone(sink), stream),
            OutputRoute::Capture | OutputRoute::Inherit => PumpTarget::Buffer(Arc::clone(captured)),
        }
    }

    fn write(&self, chunk: &[u8]) {
        match self {
            PumpTarget::Sink(sink, Stream::Stdout) => sink.write_stdout(chunk),
            PumpTarget::Sink(sink, Stream::Stderr) => sink.write_stderr(chunk),
            PumpTarget::Buffer(buf) => buf
                .lock()
                .unwrap_or_else(|p| p.into_inner())
                .extend_from_slice(chunk),
        }
    }
}

/// Copy a child stream line by line into its target.
///
/// Works on raw bytes so that non-UTF-8 output passes through unchanged.
/// A line longer than `max_chunk` is forwarded in pieces of at most
/// `max_chunk` bytes.
async fn pump<R>(reader: R, target: PumpTarget, tag: String, max_chunk: usize)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        let mut bounded = (&mut reader).take(max_chunk as u64);
        match bounded.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => target.write(&line),
            Err(e) => {
                debug!(tag = %tag, error = %e, "error reading command output");
                break;
            }
        }
    }
}

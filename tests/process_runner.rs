// tests/process_runner.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use multirun::engine::{CancelToken, CommandStatus, Engine};
use multirun::exec::{CommandRunner, OutputRoute, ProcessRunner, RunIo};
use multirun::resolve::ResolvedCommand;
use multirun::types::StdinMode;
use multirun_test_utils::builders::policy;
use multirun_test_utils::capture::capture_sink;
use multirun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn command(index: usize, tag: &str, program: PathBuf) -> ResolvedCommand {
    ResolvedCommand {
        index,
        tag: tag.to_string(),
        program,
        args: vec![],
        env: vec![],
    }
}

fn capture_io() -> RunIo {
    RunIo {
        stdin: StdinMode::Null,
        output: OutputRoute::Capture,
    }
}

#[tokio::test]
async fn exit_code_is_reported() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "fail.sh", "exit 7")?;

    let outcome = with_timeout(ProcessRunner.run(&command(0, "fail", script), &capture_io())).await;

    assert_eq!(outcome.status, CommandStatus::Exited(7));
    assert_eq!(outcome.output, Some(vec![]));
    Ok(())
}

#[tokio::test]
async fn args_and_env_reach_the_child() -> TestResult {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "echo.sh", r#"echo "$1 $2 $GREETING""#)?;

    let mut cmd = command(0, "echo", script);
    cmd.args = vec!["--flag".into(), "two words".into()];
    cmd.env = vec![
        ("GREETING".into(), "first".into()),
        ("GREETING".into(), "hello".into()),
    ];

    let outcome = with_timeout(ProcessRunner.run(&cmd, &capture_io())).await;

    assert_eq!(outcome.status, CommandStatus::Exited(0));
    // Later entries override earlier ones.
    assert_eq!(outcome.output, Some(b"--flag two words hello\n".to_vec()));
    Ok(())
}

#[tokio::test]
async fn captured_output_combines_both_streams() -> TestResult {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "both.sh", "echo out\necho err >&2")?;

    let outcome = with_timeout(ProcessRunner.run(&command(0, "both", script), &capture_io())).await;

    let text = String::from_utf8(outcome.output.unwrap_or_default())?;
    assert!(text.contains("out\n"));
    assert!(text.contains("err\n"));
    Ok(())
}

#[tokio::test]
async fn null_stdin_reads_end_of_file() -> TestResult {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "cat.sh", "cat; echo done")?;

    let outcome = with_timeout(ProcessRunner.run(&command(0, "cat", script), &capture_io())).await;

    assert_eq!(outcome.output, Some(b"done\n".to_vec()));
    Ok(())
}

#[tokio::test]
async fn forwarded_output_keeps_streams_apart() -> TestResult {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "both.sh", "echo out\necho err >&2")?;
    let (sink, stdout, stderr) = capture_sink();
    let io = RunIo {
        stdin: StdinMode::Null,
        output: OutputRoute::Forward(Arc::clone(&sink)),
    };

    let outcome = with_timeout(ProcessRunner.run(&command(0, "both", script), &io)).await;

    assert_eq!(outcome.status, CommandStatus::Exited(0));
    assert_eq!(outcome.output, None);
    assert_eq!(stdout.text(), "out\n");
    assert_eq!(stderr.text(), "err\n");
    Ok(())
}

#[tokio::test]
async fn missing_program_is_a_spawn_failure() -> TestResult {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("does-not-exist");

    let outcome = with_timeout(ProcessRunner.run(&command(0, "ghost", missing), &capture_io())).await;

    assert!(matches!(outcome.status, CommandStatus::SpawnFailed(_)));
    Ok(())
}

#[tokio::test]
async fn non_executable_file_is_a_spawn_failure() -> TestResult {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("plain.txt");
    fs::write(&path, "not a program")?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644))?;

    let outcome = with_timeout(ProcessRunner.run(&command(0, "plain", path), &capture_io())).await;

    assert!(matches!(outcome.status, CommandStatus::SpawnFailed(_)));
    Ok(())
}

#[tokio::test]
async fn signal_death_reports_minus_one_and_exits_one() -> TestResult {
    let dir = tempfile::tempdir()?;
    let script = write_script(dir.path(), "die.sh", "kill -9 $$")?;
    let (sink, _stdout, _stderr) = capture_sink();
    let engine = Engine::new(policy(1), ProcessRunner, sink, CancelToken::new());

    let summary = with_timeout(engine.run(vec![command(0, "die", script)])).await;

    assert_eq!(summary.result_for(0).map(|r| &r.status), Some(&CommandStatus::Exited(-1)));
    assert_eq!(summary.exit_code(), 1);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallel_buffered_run_of_real_processes() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let a = write_script(dir.path(), "a.sh", "echo a1; sleep 0.1; echo a2")?;
    let b = write_script(dir.path(), "b.sh", "echo b1; echo b2")?;
    let c = write_script(dir.path(), "c.sh", "echo c1; exit 3")?;

    let (sink, stdout, _stderr) = capture_sink();
    let mut policy = policy(0);
    policy.buffer_output = true;
    policy.stop_on_error = false;
    let engine = Engine::new(policy, ProcessRunner, sink, CancelToken::new());

    let summary = with_timeout(engine.run(vec![
        command(0, "a", a),
        command(1, "b", b),
        command(2, "c", c),
    ]))
    .await;

    let text = stdout.text();
    assert!(text.contains("Running a\na1\na2\n"));
    assert!(text.contains("Running b\nb1\nb2\n"));
    assert!(text.contains("Running c\nc1\n"));
    assert_eq!(summary.exit_code(), 3);
    Ok(())
}

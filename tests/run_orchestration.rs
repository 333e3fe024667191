// tests/run_orchestration.rs
#![cfg(unix)]

use std::error::Error;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use multirun::cli::CliArgs;
use multirun::errors::MultirunError;
use multirun::resolve::runfiles::{DIR_ENV, MANIFEST_ENV};
use multirun_test_utils::{init_tracing, with_timeout};
use serde_json::json;

type TestResult = Result<(), Box<dyn Error>>;

fn write_script(dir: &Path, name: &str, body: &str) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
    Ok(path)
}

fn write_instructions(dir: &Path, doc: serde_json::Value) -> Result<PathBuf, Box<dyn Error>> {
    let path = dir.join("run_all.json");
    fs::write(&path, serde_json::to_string_pretty(&doc)?)?;
    Ok(path)
}

fn args_for(instructions: PathBuf) -> CliArgs {
    CliArgs {
        instructions: Some(instructions),
        log_level: None,
        dry_run: false,
        args: vec![],
    }
}

fn multirun_binary(instructions: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_multirun"));
    cmd.arg("-f")
        .arg(instructions)
        .env_remove(MANIFEST_ENV)
        .env_remove(DIR_ENV);
    cmd
}

/// A runnable command followed by one that cannot be resolved.
fn half_resolvable(dir: &Path, marker: &Path) -> Result<PathBuf, Box<dyn Error>> {
    let touch = write_script(dir, "touch.sh", &format!("touch '{}'", marker.display()))?;
    write_instructions(
        dir,
        json!({
            "commands": [
                {"tag": "touch", "path": touch},
                {"tag": "broken", "path": "no_such_repo/no/such/tool"}
            ],
            "jobs": 0
        }),
    )
}

#[tokio::test]
async fn unresolvable_command_aborts_before_anything_runs() -> TestResult {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("ran");
    let instructions = half_resolvable(dir.path(), &marker)?;

    let result = with_timeout(multirun::run(args_for(instructions))).await;

    let err = match result {
        Ok(code) => return Err(format!("expected an error, got exit code {code}").into()),
        Err(err) => err,
    };
    assert!(matches!(
        err.downcast_ref::<MultirunError>(),
        Some(MultirunError::Resolution { .. })
    ));
    assert!(!marker.exists());
    Ok(())
}

#[tokio::test]
async fn unreadable_instructions_fail_the_run() -> TestResult {
    let dir = tempfile::tempdir()?;

    let result = with_timeout(multirun::run(args_for(dir.path().join("absent.json")))).await;

    let err = match result {
        Ok(code) => return Err(format!("expected an error, got exit code {code}").into()),
        Err(err) => err,
    };
    assert!(matches!(
        err.downcast_ref::<MultirunError>(),
        Some(MultirunError::ReadInstructions { .. })
    ));
    Ok(())
}

#[tokio::test]
async fn failing_command_code_is_returned() -> TestResult {
    let dir = tempfile::tempdir()?;
    let ok = write_script(dir.path(), "ok.sh", "exit 0")?;
    let bad = write_script(dir.path(), "bad.sh", "exit 4")?;
    let instructions = write_instructions(
        dir.path(),
        json!({"commands": [{"path": ok}, {"path": bad}], "printCommand": false}),
    )?;

    let code = with_timeout(multirun::run(args_for(instructions))).await?;

    assert_eq!(code, 4);
    Ok(())
}

#[test]
fn binary_exits_one_when_resolution_fails() -> TestResult {
    let dir = tempfile::tempdir()?;
    let marker = dir.path().join("ran");
    let instructions = half_resolvable(dir.path(), &marker)?;

    let output = multirun_binary(&instructions).output()?;

    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("multirun: "));
    assert!(stderr.contains("no_such_repo/no/such/tool"));
    assert!(!marker.exists());
    Ok(())
}

#[test]
fn binary_exits_one_on_missing_instructions() -> TestResult {
    let dir = tempfile::tempdir()?;

    let output = multirun_binary(&dir.path().join("absent.json")).output()?;

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("absent.json"));
    Ok(())
}

#[test]
fn binary_surfaces_the_failing_exit_code() -> TestResult {
    let dir = tempfile::tempdir()?;
    let bad = write_script(dir.path(), "bad.sh", "echo from-bad; exit 3")?;
    let instructions = write_instructions(dir.path(), json!({"commands": [{"tag": "bad", "path": bad}]}))?;

    let output = multirun_binary(&instructions).output()?;

    assert_eq!(output.status.code(), Some(3));
    assert!(String::from_utf8_lossy(&output.stdout).contains("from-bad"));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Running bad"));
    Ok(())
}

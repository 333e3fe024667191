// tests/buffered_output.rs

use std::error::Error;

use multirun::engine::{CancelToken, Engine};
use multirun_test_utils::builders::{policy, resolved_all};
use multirun_test_utils::capture::capture_sink;
use multirun_test_utils::fake_runner::{Script, ScriptedRunner};
use multirun_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn buffered_blocks_hold_exactly_one_command_each() -> TestResult {
    init_tracing();

    let runner = ScriptedRunner::new()
        .script("alpha", Script::exit(0).delay_ms(30).output("a1\na2\na3\n"))
        .script("beta", Script::exit(0).delay_ms(10).output("b1\nb2\n"))
        .script("gamma", Script::exit(0).output("g1\n"));
    let (sink, stdout, stderr) = capture_sink();
    let mut policy = policy(0);
    policy.buffer_output = true;
    let engine = Engine::new(policy, runner, sink, CancelToken::new());

    let summary = with_timeout(engine.run(resolved_all(&["alpha", "beta", "gamma"]))).await;
    assert!(summary.success());

    let text = stdout.text();
    assert!(text.contains("Running alpha\na1\na2\na3\n"));
    assert!(text.contains("Running beta\nb1\nb2\n"));
    assert!(text.contains("Running gamma\ng1\n"));
    assert_eq!(text.lines().count(), 9);
    // The tag line belongs to the block in buffered mode.
    assert!(stderr.text().is_empty());
    Ok(())
}

#[tokio::test]
async fn buffered_without_tags_prints_only_output() -> TestResult {
    let runner = ScriptedRunner::new()
        .script("one", Script::exit(0).output("first"))
        .script("two", Script::exit(0).output("second\n"));
    let (sink, stdout, stderr) = capture_sink();
    let mut policy = policy(1);
    policy.buffer_output = true;
    policy.tag_output = false;
    let engine = Engine::new(policy, runner, sink, CancelToken::new());

    with_timeout(engine.run(resolved_all(&["one", "two"]))).await;

    // Unterminated output gets a newline so blocks stay separate.
    assert_eq!(stdout.text(), "first\nsecond\n");
    assert!(stderr.text().is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_command_output_is_still_flushed() -> TestResult {
    let runner = ScriptedRunner::new().script("lint", Script::exit(1).output("error: bad\n"));
    let (sink, stdout, _stderr) = capture_sink();
    let mut policy = policy(1);
    policy.buffer_output = true;
    let engine = Engine::new(policy, runner, sink, CancelToken::new());

    let summary = with_timeout(engine.run(resolved_all(&["lint"]))).await;

    assert_eq!(summary.exit_code(), 1);
    assert_eq!(stdout.text(), "Running lint\nerror: bad\n");
    assert_eq!(
        summary.result_for(0).and_then(|r| r.output.clone()),
        Some(b"error: bad\n".to_vec())
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn streamed_output_is_forwarded_as_it_is_produced() -> TestResult {
    let runner = ScriptedRunner::new()
        .script("web", Script::exit(0).output("listening\n"))
        .script("worker", Script::exit(0).delay_ms(10).output("ready\n"));
    let (sink, stdout, stderr) = capture_sink();
    let engine = Engine::new(policy(0), runner, sink, CancelToken::new());

    let summary = with_timeout(engine.run(resolved_all(&["web", "worker"]))).await;

    assert!(summary.success());
    assert!(summary.results().iter().all(|r| r.output.is_none()));
    assert_eq!(stdout.lines(), vec!["listening", "ready"]);
    assert_eq!(stderr.lines(), vec!["Running web", "Running worker"]);
    Ok(())
}

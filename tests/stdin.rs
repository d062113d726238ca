#![cfg(unix)]

mod common;
use crate::common::{
    init_tracing, wait_for_status, with_timeout, CapturedOutput, ProcessDefinitionBuilder,
};

use std::error::Error;
use std::time::Duration;

use conductor::errors::ConductorError;
use conductor::group::{GroupOptions, RunGroup};
use conductor::process::{ProcessDefinition, ProcessStatus};

type TestResult = Result<(), Box<dyn Error>>;

fn captured_group(defs: Vec<ProcessDefinition>) -> Result<(RunGroup, CapturedOutput), Box<dyn Error>> {
    let out = CapturedOutput::new();
    let options = GroupOptions {
        sink: out.sink(),
        ..GroupOptions::default()
    };
    Ok((RunGroup::with_options(defs, options)?, out))
}

#[tokio::test]
async fn start_stream_is_sent_once_after_launch() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::command("greeter", "head", &["-n", "1"])
        .start_stream("hello\n")
        .build();

    let (mut group, out) = captured_group(vec![def])?;
    group.start();
    with_timeout(group.join()).await;

    assert_eq!(out.lines(), vec!["greeter | hello".to_string()]);
    assert_eq!(group.status("greeter"), Some(ProcessStatus::Exited));
    Ok(())
}

#[tokio::test]
async fn write_forwards_text_to_running_process() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("echoer", "read line; echo \"got $line\"").build();

    let (mut group, out) = captured_group(vec![def])?;
    let mut status = group.context("echoer").ok_or("missing context")?.watch_status();
    group.start();

    wait_for_status(&mut status, ProcessStatus::Running).await;
    group.write("echoer", "ping\n").await?;
    with_timeout(group.join()).await;

    assert_eq!(out.lines(), vec!["echoer | got ping".to_string()]);
    Ok(())
}

#[tokio::test]
async fn stdin_handle_works_from_another_task() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("echoer", "read a; read b; echo \"$a-$b\"").build();

    let (mut group, out) = captured_group(vec![def])?;
    let handle = group.stdin("echoer")?;
    assert_eq!(handle.process(), "echoer");

    let mut status = group.context("echoer").ok_or("missing context")?.watch_status();
    group.start();
    wait_for_status(&mut status, ProcessStatus::Running).await;

    let writer = tokio::spawn(async move {
        handle.write("left\n").await?;
        handle.write("right\n").await
    });
    writer.await??;

    with_timeout(group.join()).await;
    assert_eq!(out.lines(), vec!["echoer | left-right".to_string()]);
    Ok(())
}

#[tokio::test]
async fn write_fails_when_process_is_not_running() -> TestResult {
    init_tracing();

    let defs = vec![
        ProcessDefinitionBuilder::new("done", "true").build(),
        ProcessDefinitionBuilder::new("gated", "cat")
            .on_error_of("done")
            .build(),
    ];

    let (mut group, _out) = captured_group(defs)?;

    // Not started yet.
    assert!(matches!(
        group.write("done", "x").await,
        Err(ConductorError::NotRunning(ref n)) if n == "done"
    ));

    group.start();
    with_timeout(group.join()).await;

    // Exited, and a context that never ran.
    assert!(matches!(
        group.write("done", "x").await,
        Err(ConductorError::NotRunning(_))
    ));
    assert!(matches!(
        group.write("gated", "x").await,
        Err(ConductorError::NotRunning(_))
    ));
    assert!(matches!(
        group.write("nobody", "x").await,
        Err(ConductorError::ProcessNotFound(ref n)) if n == "nobody"
    ));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn stop_is_not_blocked_by_a_write_the_process_never_reads() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("deaf", "exec sleep 30")
        .timeout_on_exit(Duration::from_millis(200))
        .build();

    let (mut group, _out) = captured_group(vec![def])?;
    let mut status = group.context("deaf").ok_or("missing context")?.watch_status();
    group.start();
    wait_for_status(&mut status, ProcessStatus::Running).await;

    // Far larger than a pipe buffer, so the write cannot complete.
    let stdin = group.stdin("deaf")?;
    let pending = tokio::spawn(async move { stdin.write("x".repeat(1 << 20)).await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    group.request_stop();
    with_timeout(group.join()).await;

    assert_eq!(group.status("deaf"), Some(ProcessStatus::Exited));
    assert!(with_timeout(pending).await?.is_err());
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unread_start_stream_does_not_block_exit() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("quick", "sleep 0.2; echo done")
        .start_stream(&"y".repeat(1 << 20))
        .build();

    let (mut group, out) = captured_group(vec![def])?;
    group.start();
    with_timeout(group.join()).await;

    assert_eq!(group.status("quick"), Some(ProcessStatus::Exited));
    assert_eq!(out.lines(), vec!["quick | done".to_string()]);
    Ok(())
}

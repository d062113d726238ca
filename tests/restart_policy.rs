#![cfg(unix)]

mod common;
use crate::common::{
    count_status, exit_codes, init_tracing, next_matching, spawn_collector, with_timeout,
    CapturedOutput, ProcessDefinitionBuilder,
};

use std::error::Error;
use std::time::Duration;

use conductor::group::{GroupOptions, RunGroup};
use conductor::process::{ProcessEvent, ProcessStatus};
use conductor::types::ExitPolicy;

type TestResult = Result<(), Box<dyn Error>>;

fn captured_group(
    defs: Vec<conductor::process::ProcessDefinition>,
) -> Result<(RunGroup, CapturedOutput), Box<dyn Error>> {
    let out = CapturedOutput::new();
    let options = GroupOptions {
        sink: out.sink(),
        ..GroupOptions::default()
    };
    Ok((RunGroup::with_options(defs, options)?, out))
}

#[tokio::test]
async fn failing_process_restarts_exactly_n_times() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("flaky", "echo run; exit 1")
        .on_failure(ExitPolicy::Restart)
        .restart_attempts(2)
        .restart_delay(Duration::from_millis(20))
        .build();

    let (mut group, out) = captured_group(vec![def])?;
    let events = spawn_collector(group.subscribe("flaky")?);

    group.start();
    with_timeout(group.join()).await;

    let events = events.await?;
    assert_eq!(exit_codes(&events), vec![1, 1, 1]);
    assert_eq!(count_status(&events, ProcessStatus::Restarting), 2);
    assert_eq!(group.status("flaky"), Some(ProcessStatus::Failed));
    assert_eq!(events.last(), Some(&ProcessEvent::Finished));

    let runs = out.lines().iter().filter(|l| *l == "flaky | run").count();
    assert_eq!(runs, 3);
    Ok(())
}

#[tokio::test]
async fn zero_restart_attempts_runs_once() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("once", "exit 4")
        .on_failure(ExitPolicy::Restart)
        .restart_attempts(0)
        .build();

    let (mut group, _out) = captured_group(vec![def])?;
    let events = spawn_collector(group.subscribe("once")?);

    group.start();
    with_timeout(group.join()).await;

    let events = events.await?;
    assert_eq!(exit_codes(&events), vec![4]);
    assert_eq!(count_status(&events, ProcessStatus::Restarting), 0);
    assert_eq!(group.status("once"), Some(ProcessStatus::Failed));
    Ok(())
}

#[tokio::test]
async fn successful_exit_uses_on_complete_policy() -> TestResult {
    init_tracing();

    // Only success restarts; the failure policy must not kick in.
    let def = ProcessDefinitionBuilder::new("job", "exit 0")
        .on_complete(ExitPolicy::Restart)
        .on_failure(ExitPolicy::Buzzkill)
        .restart_attempts(1)
        .build();

    let (mut group, _out) = captured_group(vec![def])?;
    let events = spawn_collector(group.subscribe("job")?);

    group.start();
    with_timeout(group.join()).await;

    let events = events.await?;
    assert_eq!(exit_codes(&events), vec![0, 0]);
    assert_eq!(group.status("job"), Some(ProcessStatus::Exited));
    assert!(group.buzzkill_origin().is_none());
    Ok(())
}

#[tokio::test]
async fn unlimited_restarts_continue_until_stopped() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("forever", "exit 1")
        .on_failure(ExitPolicy::Restart)
        .restart_attempts(-1)
        .restart_delay(Duration::from_millis(10))
        .build();

    let (mut group, _out) = captured_group(vec![def])?;
    let mut rx = group.subscribe("forever")?;
    let events = spawn_collector(group.subscribe("forever")?);

    group.start();

    // Well past any finite budget a misparsed -1 could turn into.
    for _ in 0..5 {
        next_matching(&mut rx, |e| matches!(e, ProcessEvent::ExitCode(_))).await;
    }

    group.request_stop();
    with_timeout(group.join()).await;

    let events = events.await?;
    assert!(exit_codes(&events).len() >= 5);
    assert_eq!(group.status("forever"), Some(ProcessStatus::Exited));
    Ok(())
}

#[tokio::test]
async fn spawn_failure_reports_minus_one_and_applies_failure_policy() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::command("ghost", "/definitely/not/a/binary", &[])
        .on_failure(ExitPolicy::Restart)
        .restart_attempts(1)
        .build();

    let (mut group, _out) = captured_group(vec![def])?;
    let events = spawn_collector(group.subscribe("ghost")?);

    group.start();
    with_timeout(group.join()).await;

    let events = events.await?;
    assert_eq!(exit_codes(&events), vec![-1, -1]);
    assert_eq!(count_status(&events, ProcessStatus::Running), 0);
    assert_eq!(group.status("ghost"), Some(ProcessStatus::NotStarted));
    Ok(())
}

#[tokio::test]
async fn start_delay_is_cancellable() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::new("late", "echo never")
        .start_delay(Duration::from_secs(30))
        .build();

    let (mut group, out) = captured_group(vec![def])?;
    group.start();

    tokio::time::sleep(Duration::from_millis(50)).await;
    group.request_stop();
    with_timeout(group.join()).await;

    assert_eq!(group.status("late"), Some(ProcessStatus::Exited));
    assert!(out.contents().is_empty());
    Ok(())
}

#[tokio::test]
async fn zero_delay_spawn_failure_loop_still_yields_to_stop() -> TestResult {
    init_tracing();

    let def = ProcessDefinitionBuilder::command("ghost", "/nonexistent/binary", &[])
        .on_failure(ExitPolicy::Restart)
        .restart_attempts(-1)
        .restart_delay(Duration::ZERO)
        .build();

    let (mut group, _out) = captured_group(vec![def])?;
    let mut rx = group.subscribe("ghost")?;
    group.start();

    // Single-threaded runtime: these only complete if the loop suspends.
    next_matching(&mut rx, |e| *e == ProcessEvent::ExitCode(-1)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    group.request_stop();
    with_timeout(group.join()).await;

    assert_eq!(group.status("ghost"), Some(ProcessStatus::Exited));
    Ok(())
}

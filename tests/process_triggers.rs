#![cfg(unix)]

mod common;
use crate::common::{
    exit_codes, init_tracing, spawn_collector, with_timeout, CapturedOutput,
    ProcessDefinitionBuilder,
};

use std::error::Error;

use conductor::group::{GroupOptions, RunGroup};
use conductor::linker::process_watch::fired_kind;
use conductor::process::{ProcessDefinition, ProcessEvent, ProcessStatus, TriggerKind};

type TestResult = Result<(), Box<dyn Error>>;

fn captured_group(defs: Vec<ProcessDefinition>) -> Result<(RunGroup, CapturedOutput), Box<dyn Error>> {
    let out = CapturedOutput::new();
    let options = GroupOptions {
        sink: out.sink(),
        ..GroupOptions::default()
    };
    Ok((RunGroup::with_options(defs, options)?, out))
}

#[test]
fn events_map_to_trigger_kinds() {
    assert_eq!(
        fired_kind(&ProcessEvent::Status(ProcessStatus::Running)),
        Some(TriggerKind::OnStart)
    );
    assert_eq!(fired_kind(&ProcessEvent::ExitCode(0)), Some(TriggerKind::OnComplete));
    assert_eq!(fired_kind(&ProcessEvent::ExitCode(2)), Some(TriggerKind::OnError));
    assert_eq!(fired_kind(&ProcessEvent::ExitCode(-1)), Some(TriggerKind::OnError));
    assert_eq!(fired_kind(&ProcessEvent::Status(ProcessStatus::Restarting)), None);
    assert_eq!(fired_kind(&ProcessEvent::Status(ProcessStatus::Exited)), None);
    assert_eq!(fired_kind(&ProcessEvent::Finished), None);
}

#[tokio::test]
async fn on_complete_chains_after_success() -> TestResult {
    init_tracing();

    let defs = vec![
        ProcessDefinitionBuilder::new("build", "echo compiled").build(),
        ProcessDefinitionBuilder::new("deploy", "echo deployed")
            .on_complete_of("build")
            .build(),
    ];

    let (mut group, out) = captured_group(defs)?;
    assert_eq!(group.status("deploy"), Some(ProcessStatus::WaitingTrigger));
    assert!(group.context("deploy").is_some_and(|c| c.is_triggered()));
    assert!(group.context("build").is_some_and(|c| !c.is_triggered()));

    let deploy = spawn_collector(group.subscribe("deploy")?);

    group.start();
    // Once `build` is done for good, `deploy` has no trigger source left.
    with_timeout(group.join()).await;

    assert_eq!(exit_codes(&deploy.await?), vec![0]);
    assert_eq!(group.status("deploy"), Some(ProcessStatus::Exited));

    let lines = out.lines();
    let built = lines.iter().position(|l| l == "build | compiled");
    let deployed = lines.iter().position(|l| l == "deploy | deployed");
    assert!(built.is_some() && deployed.is_some());
    assert!(built < deployed);
    Ok(())
}

#[tokio::test]
async fn on_error_fires_only_on_failure() -> TestResult {
    init_tracing();

    let defs = vec![
        ProcessDefinitionBuilder::new("tests", "exit 3").build(),
        ProcessDefinitionBuilder::new("alert", "echo tests failed")
            .on_error_of("tests")
            .build(),
        ProcessDefinitionBuilder::new("publish", "echo publishing")
            .on_complete_of("tests")
            .build(),
    ];

    let (mut group, out) = captured_group(defs)?;
    let alert = spawn_collector(group.subscribe("alert")?);
    let publish = spawn_collector(group.subscribe("publish")?);

    group.start();
    with_timeout(group.join()).await;

    assert_eq!(exit_codes(&alert.await?), vec![0]);
    let publish = publish.await?;
    assert!(exit_codes(&publish).is_empty());
    assert!(!publish.contains(&ProcessEvent::Status(ProcessStatus::Running)));

    assert_eq!(group.status("tests"), Some(ProcessStatus::Failed));
    assert_eq!(group.status("publish"), Some(ProcessStatus::Exited));
    assert!(out.contents().contains("alert | tests failed"));
    assert!(!out.contents().contains("publishing"));
    Ok(())
}

#[tokio::test]
async fn on_start_fires_while_target_is_running() -> TestResult {
    init_tracing();

    let defs = vec![
        ProcessDefinitionBuilder::new("server", "sleep 0.3").build(),
        ProcessDefinitionBuilder::new("client", "echo connected")
            .on_start_of("server")
            .build(),
    ];

    let (mut group, out) = captured_group(defs)?;
    let server = spawn_collector(group.subscribe("server")?);
    let client = spawn_collector(group.subscribe("client")?);

    group.start();
    with_timeout(group.join()).await;

    assert_eq!(exit_codes(&client.await?), vec![0]);
    assert_eq!(exit_codes(&server.await?), vec![0]);
    assert!(out.contents().contains("client | connected"));
    Ok(())
}

#[tokio::test]
async fn one_target_can_feed_several_trigger_kinds() -> TestResult {
    init_tracing();

    let defs = vec![
        ProcessDefinitionBuilder::new("job", "exit 0").build(),
        ProcessDefinitionBuilder::new("watcher", "echo saw it")
            .on_start_of("job")
            .on_complete_of("job")
            .build(),
        ProcessDefinitionBuilder::new("other", "true")
            .on_error_of("job")
            .build(),
    ];

    let (mut group, _out) = captured_group(defs)?;
    let watcher = spawn_collector(group.subscribe("watcher")?);

    group.start();
    with_timeout(group.join()).await;

    // Start and completion arrive back to back; the second is dropped or
    // honoured depending on timing, never queued twice.
    let runs = exit_codes(&watcher.await?).len();
    assert!((1..=2).contains(&runs));
    Ok(())
}

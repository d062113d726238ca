#![allow(dead_code)]

use std::time::Duration;

use tokio::sync::{broadcast, watch};

use conductor::process::{ProcessEvent, ProcessStatus};

pub use conductor_test_utils::{
    init_tracing, with_timeout, with_timeout_of, CapturedOutput, ProcessDefinitionBuilder,
    RecordingTerminator, TerminatorCall,
};

/// Collect a context's events until its final `Finished` event.
pub async fn collect_until_finished(
    mut rx: broadcast::Receiver<ProcessEvent>,
) -> Vec<ProcessEvent> {
    let mut events = Vec::new();
    loop {
        match rx.recv().await {
            Ok(ProcessEvent::Finished) => {
                events.push(ProcessEvent::Finished);
                break;
            }
            Ok(event) => events.push(event),
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    events
}

/// Spawn a collector so events are gathered while the test drives the group.
pub fn spawn_collector(
    rx: broadcast::Receiver<ProcessEvent>,
) -> tokio::task::JoinHandle<Vec<ProcessEvent>> {
    tokio::spawn(collect_until_finished(rx))
}

pub fn exit_codes(events: &[ProcessEvent]) -> Vec<i32> {
    events
        .iter()
        .filter_map(|e| match e {
            ProcessEvent::ExitCode(code) => Some(*code),
            _ => None,
        })
        .collect()
}

pub fn count_status(events: &[ProcessEvent], status: ProcessStatus) -> usize {
    events
        .iter()
        .filter(|e| **e == ProcessEvent::Status(status))
        .count()
}

/// Wait until `rx` reports `status`.
pub async fn wait_for_status(rx: &mut watch::Receiver<ProcessStatus>, status: ProcessStatus) {
    with_timeout(rx.wait_for(|s| *s == status))
        .await
        .expect("status sender dropped");
}

/// Wait for the next event matching `pred`.
pub async fn next_matching<F>(rx: &mut broadcast::Receiver<ProcessEvent>, pred: F) -> ProcessEvent
where
    F: Fn(&ProcessEvent) -> bool,
{
    with_timeout(async {
        loop {
            match rx.recv().await {
                Ok(event) if pred(&event) => return event,
                Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => panic!("event stream closed"),
            }
        }
    })
    .await
}

pub const SETTLE: Duration = Duration::from_millis(500);

// src/linker/process_watch.rs

//! Process trigger source: one listener per (dependent, target) pair.

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::context::TriggerReason;
use crate::group::Cancellation;
use crate::process::{ProcessEvent, ProcessStatus, TriggerKind};

/// Which trigger kind, if any, a target's event corresponds to.
pub fn fired_kind(event: &ProcessEvent) -> Option<TriggerKind> {
    match event {
        ProcessEvent::Status(ProcessStatus::Running) => Some(TriggerKind::OnStart),
        ProcessEvent::Status(
            ProcessStatus::NotStarted
            | ProcessStatus::WaitingTrigger
            | ProcessStatus::Restarting
            | ProcessStatus::Exited
            | ProcessStatus::Failed,
        ) => None,
        ProcessEvent::ExitCode(0) => Some(TriggerKind::OnComplete),
        ProcessEvent::ExitCode(_) => Some(TriggerKind::OnError),
        ProcessEvent::Finished => None,
    }
}

/// Listen to `target`'s events and wake `dependent` on any of `kinds`.
///
/// Ends when the target finishes, the dependent finishes, or the group is
/// cancelled; dropping the sender lets the dependent see it has one trigger
/// source fewer.
pub(crate) fn spawn_listener(
    dependent: String,
    target: String,
    kinds: Vec<TriggerKind>,
    mut events: broadcast::Receiver<ProcessEvent>,
    trigger_tx: mpsc::Sender<TriggerReason>,
    mut cancel: Cancellation,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!(process = %dependent, target = %target, ?kinds, "process trigger listener started");

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = trigger_tx.closed() => break,
                res = events.recv() => match res {
                    Ok(ProcessEvent::Finished) | Err(RecvError::Closed) => break,
                    Ok(event) => {
                        let Some(kind) = fired_kind(&event) else {
                            continue;
                        };
                        if !kinds.contains(&kind) {
                            continue;
                        }
                        let reason = TriggerReason::Process {
                            target: target.clone(),
                            kind,
                        };
                        match trigger_tx.try_send(reason) {
                            Ok(()) => debug!(process = %dependent, target = %target, kind = kind.as_str(), "process trigger fired"),
                            Err(TrySendError::Full(_)) => {
                                debug!(process = %dependent, target = %target, "process busy; dropping trigger");
                            }
                            Err(TrySendError::Closed(_)) => break,
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(process = %dependent, target = %target, skipped, "missed events from trigger target");
                    }
                },
            }
        }

        debug!(process = %dependent, target = %target, "process trigger listener stopped");
    })
}

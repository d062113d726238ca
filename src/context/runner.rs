// src/context/runner.rs

//! The per-context run loop.
//!
//! Restarts are an explicit loop over attempts, never recursion. The group
//! completion guard is held for the whole loop and released exactly once in
//! [`Runner::cleanup`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use super::attempt::AttemptEnd;
use super::{Published, StdinRequest, TriggerReason};
use crate::group::{Buzzkill, Cancellation, CompletionGuard};
use crate::output::OutputWriter;
use crate::process::{ProcessDefinition, ProcessEvent, ProcessStatus};
use crate::terminate::Terminator;
use crate::types::ExitPolicy;

/// Result of waiting for a trigger.
enum Wake {
    Triggered(TriggerReason),
    Cancelled,
    /// Every trigger source is gone; nothing can wake this context again.
    Exhausted,
}

/// Everything the run loop owns. Built with the context, moved into the
/// spawned task on `start`.
pub(crate) struct Runner {
    pub(crate) definition: Arc<ProcessDefinition>,
    pub(crate) published: Arc<Published>,
    pub(crate) stdin_rx: mpsc::Receiver<StdinRequest>,
    trigger_rx: mpsc::Receiver<TriggerReason>,
    triggered: bool,
    pub(crate) cancel: Cancellation,
    buzzkill: Buzzkill,
    pub(crate) terminator: Arc<dyn Terminator>,
    pub(crate) output: OutputWriter,
    pub(crate) start_stream: Option<String>,
}

impl Runner {
    pub(crate) fn new(
        definition: Arc<ProcessDefinition>,
        published: Arc<Published>,
        stdin_rx: mpsc::Receiver<StdinRequest>,
        trigger_rx: mpsc::Receiver<TriggerReason>,
        buzzkill: Buzzkill,
        terminator: Arc<dyn Terminator>,
        output: OutputWriter,
    ) -> Self {
        let start_stream = definition.start_stream.clone();
        Self {
            definition,
            published,
            stdin_rx,
            trigger_rx,
            triggered: false,
            cancel: buzzkill.subscribe(),
            buzzkill,
            terminator,
            output,
            start_stream,
        }
    }

    pub(crate) fn set_triggered(&mut self, triggered: bool) {
        self.triggered = triggered;
    }

    pub(crate) fn set_status(&self, status: ProcessStatus) {
        self.published.set_status(&self.definition.name, status);
    }

    pub(crate) async fn run(mut self, guard: CompletionGuard) {
        info!(
            process = %self.definition.name,
            triggered = self.triggered,
            "execution context started"
        );
        self.lifecycle().await;
        self.cleanup(guard);
    }

    async fn lifecycle(&mut self) {
        let name = self.definition.name.clone();
        let mut has_run = false;

        loop {
            if self.triggered {
                match self.wait_for_trigger(has_run).await {
                    Wake::Triggered(reason) => {
                        info!(process = %name, ?reason, "trigger fired");
                    }
                    Wake::Cancelled => {
                        self.set_status(ProcessStatus::Exited);
                        return;
                    }
                    Wake::Exhausted => {
                        info!(process = %name, "no trigger source left; finishing");
                        self.set_status(ProcessStatus::Exited);
                        return;
                    }
                }
            }

            let start_delay = self.definition.start_delay;
            if !start_delay.is_zero() && !self.sleep_unless_cancelled(start_delay).await {
                self.set_status(ProcessStatus::Exited);
                return;
            }

            has_run = true;

            // Fresh budget for every run; restarts within a run consume it.
            let mut budget = self.definition.restart_attempts;
            let mut attempt_no: u32 = 1;

            loop {
                let code = match self.attempt().await {
                    AttemptEnd::Cancelled => return,
                    AttemptEnd::Exited { code } => code,
                };

                let success = code == 0;
                let policy = self.definition.policy_for(success);
                debug!(process = %name, exit_code = code, ?policy, attempt = attempt_no, "applying exit policy");

                match policy {
                    ExitPolicy::Wait => break,
                    ExitPolicy::Buzzkill => {
                        self.buzzkill.fire(&name);
                        return;
                    }
                    ExitPolicy::Restart => {
                        if !budget.consume() {
                            info!(process = %name, attempts = attempt_no, "restart attempts exhausted");
                            break;
                        }

                        self.set_status(ProcessStatus::Restarting);
                        info!(
                            process = %name,
                            delay_ms = self.definition.restart_delay.as_millis() as u64,
                            "restarting process"
                        );

                        let delay = self.definition.restart_delay;
                        if !self.sleep_unless_cancelled(delay).await {
                            self.set_status(ProcessStatus::Exited);
                            return;
                        }
                        attempt_no += 1;
                    }
                }
            }

            if !self.triggered {
                return;
            }
        }
    }

    /// Park in `WaitingTrigger` until a trigger, a cancellation, or the
    /// loss of every trigger source.
    ///
    /// After a run, triggers that arrived while it was busy are dropped.
    /// Before the first run a queued trigger is honoured.
    async fn wait_for_trigger(&mut self, after_run: bool) -> Wake {
        self.set_status(ProcessStatus::WaitingTrigger);

        if after_run {
            while let Ok(stale) = self.trigger_rx.try_recv() {
                debug!(process = %self.definition.name, ?stale, "dropping trigger received while busy");
            }
        }

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Wake::Cancelled,
            reason = self.trigger_rx.recv() => match reason {
                Some(reason) => Wake::Triggered(reason),
                None => Wake::Exhausted,
            },
        }
    }

    /// Returns `false` if the group was cancelled before `delay` elapsed.
    async fn sleep_unless_cancelled(&mut self, delay: Duration) -> bool {
        if delay.is_zero() {
            // Always suspend: a restart loop that never spawns must not
            // starve the runtime.
            tokio::task::yield_now().await;
            return !self.cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    /// Terminal bookkeeping: close every channel into this context (which
    /// stops its trigger sources), signal the group once, then announce
    /// `Finished`.
    fn cleanup(mut self, guard: CompletionGuard) {
        self.stdin_rx.close();
        self.reject_pending_writes();
        self.trigger_rx.close();

        let status = *self.published.status.borrow();
        guard.complete();

        info!(process = %self.definition.name, %status, "execution context finished");
        self.published.emit(ProcessEvent::Finished);
    }
}

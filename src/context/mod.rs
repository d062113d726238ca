// src/context/mod.rs

//! Execution contexts: one per process definition.
//!
//! An [`ExecutionContext`] is the handle the rest of the system holds. It
//! owns the channels into the context's run loop and publishes read-only
//! views of its state:
//!
//! - a status `watch` (current value),
//! - a `broadcast` stream of [`ProcessEvent`]s (every transition, in order).
//!
//! The run loop itself lives in [`runner`]; a single launch of the OS process
//! (spawn, monitor, stop) lives in [`attempt`].

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::{ConductorError, Result};
use crate::group::{Buzzkill, Cancellation, WaitGroup};
use crate::output::{OutputSink, OutputWriter};
use crate::process::{ProcessDefinition, ProcessEvent, ProcessStatus, TriggerKind};
use crate::terminate::Terminator;

pub mod attempt;
pub mod runner;

use runner::Runner;

const EVENT_CAPACITY: usize = 64;
const STDIN_CAPACITY: usize = 16;

/// Why a trigger-gated context was woken up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerReason {
    /// A watched path changed.
    FileChange(PathBuf),
    /// Another process started, completed or failed.
    Process { target: String, kind: TriggerKind },
}

/// Group-wide collaborators every context is built with.
#[derive(Debug, Clone)]
pub struct GroupResources {
    pub buzzkill: Buzzkill,
    pub terminator: Arc<dyn Terminator>,
    pub sink: OutputSink,
}

/// A request to write text to the running process's stdin.
#[derive(Debug)]
pub(crate) struct StdinRequest {
    pub text: String,
    pub reply: oneshot::Sender<Result<()>>,
}

/// State a context publishes to observers.
#[derive(Debug)]
pub(crate) struct Published {
    pub status: watch::Sender<ProcessStatus>,
    pub pid: watch::Sender<Option<u32>>,
    pub events: broadcast::Sender<ProcessEvent>,
}

impl Published {
    /// Record a new status; emits an event only if it actually changed.
    pub fn set_status(&self, name: &str, status: ProcessStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            debug!(process = %name, %status, "status changed");
            self.emit(ProcessEvent::Status(status));
        }
    }

    pub fn emit(&self, event: ProcessEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

/// Write side of a context's stdin, detached from the context itself.
#[derive(Debug, Clone)]
pub struct StdinHandle {
    name: String,
    published: Arc<Published>,
    tx: mpsc::Sender<StdinRequest>,
}

impl StdinHandle {
    pub fn process(&self) -> &str {
        &self.name
    }

    /// Fails with `NotRunning` unless the process is currently `Running`.
    pub async fn write(&self, text: impl Into<String>) -> Result<()> {
        if *self.published.status.borrow() != ProcessStatus::Running {
            return Err(ConductorError::NotRunning(self.name.clone()));
        }

        let (reply, reply_rx) = oneshot::channel();
        self.tx
            .send(StdinRequest {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| ConductorError::NotRunning(self.name.clone()))?;

        reply_rx
            .await
            .map_err(|_| ConductorError::NotRunning(self.name.clone()))?
    }
}

pub struct ExecutionContext {
    definition: Arc<ProcessDefinition>,
    published: Arc<Published>,
    buzzkill: Buzzkill,
    stdin_tx: mpsc::Sender<StdinRequest>,
    trigger_tx: Option<mpsc::Sender<TriggerReason>>,
    triggered: bool,
    runner: Option<Runner>,
    task: Option<JoinHandle<()>>,
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("name", &self.definition.name)
            .field("status", &self.status())
            .field("triggered", &self.triggered)
            .finish_non_exhaustive()
    }
}

impl ExecutionContext {
    pub fn new(definition: ProcessDefinition, resources: &GroupResources) -> Self {
        let definition = Arc::new(definition);
        let (status, _) = watch::channel(ProcessStatus::NotStarted);
        let (pid, _) = watch::channel(None);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let published = Arc::new(Published {
            status,
            pid,
            events,
        });

        let (stdin_tx, stdin_rx) = mpsc::channel(STDIN_CAPACITY);
        // Capacity 1: at most one trigger is ever pending.
        let (trigger_tx, trigger_rx) = mpsc::channel(1);

        let output = OutputWriter::from_definition(&definition, resources.sink.clone());
        let runner = Runner::new(
            Arc::clone(&definition),
            Arc::clone(&published),
            stdin_rx,
            trigger_rx,
            resources.buzzkill.clone(),
            Arc::clone(&resources.terminator),
            output,
        );

        Self {
            definition,
            published,
            buzzkill: resources.buzzkill.clone(),
            stdin_tx,
            trigger_tx: Some(trigger_tx),
            triggered: false,
            runner: Some(runner),
            task: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.definition.name
    }

    pub fn definition(&self) -> &ProcessDefinition {
        &self.definition
    }

    pub fn status(&self) -> ProcessStatus {
        *self.published.status.borrow()
    }

    /// Pid of the currently running OS process.
    pub fn pid(&self) -> Option<u32> {
        *self.published.pid.borrow()
    }

    /// Whether the linker gated this context behind a trigger.
    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn is_started(&self) -> bool {
        self.runner.is_none()
    }

    /// Ordered stream of everything this context does from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.published.events.subscribe()
    }

    pub fn watch_status(&self) -> watch::Receiver<ProcessStatus> {
        self.published.status.subscribe()
    }

    pub(crate) fn cancellation(&self) -> Cancellation {
        self.buzzkill.subscribe()
    }

    /// Hand out a trigger sender and gate the context behind it.
    ///
    /// Returns `None` once the context has started.
    pub(crate) fn trigger_sender(&mut self) -> Option<mpsc::Sender<TriggerReason>> {
        let tx = self.trigger_tx.as_ref()?.clone();
        if !self.triggered {
            self.triggered = true;
            self.published
                .set_status(&self.definition.name, ProcessStatus::WaitingTrigger);
        }
        Some(tx)
    }

    /// Launch the run loop. Registers with `wait_group` before spawning.
    ///
    /// Calling this twice is a no-op.
    pub fn start(&mut self, wait_group: &WaitGroup) {
        let Some(mut runner) = self.runner.take() else {
            warn!(process = %self.definition.name, "context already started");
            return;
        };
        // Only trigger sources may keep the trigger channel open from here on.
        self.trigger_tx = None;
        runner.set_triggered(self.triggered);

        let guard = wait_group.add();
        self.task = Some(tokio::spawn(runner.run(guard)));
    }

    /// Request a group-wide stop, as if this process had buzzkilled.
    pub fn request_stop(&self) {
        self.buzzkill.fire(&self.definition.name);
    }

    /// A cloneable handle for writing to this context's stdin from
    /// another task.
    pub fn stdin(&self) -> StdinHandle {
        StdinHandle {
            name: self.definition.name.clone(),
            published: Arc::clone(&self.published),
            tx: self.stdin_tx.clone(),
        }
    }

    /// Forward `text` verbatim to the running process's stdin.
    pub async fn write(&self, text: impl Into<String>) -> Result<()> {
        self.stdin().write(text).await
    }

    /// Wait for the run loop task to end (no-op if it never started).
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(process = %self.definition.name, error = %e, "run loop task failed");
            }
        }
    }
}

// src/group/mod.rs

//! Run groups: every execution context launched together.
//!
//! - [`buzzkill`] is the group-wide cancellation broadcast.
//! - [`wait_group`] is the completion counter behind [`RunGroup::wait`].
//!
//! [`RunGroup`] wires these together with one [`ExecutionContext`] per
//! definition and links the contexts' triggers before anything starts.

pub mod buzzkill;
pub mod wait_group;

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::info;

pub use buzzkill::{Buzzkill, Cancellation};
pub use wait_group::{CompletionGuard, WaitGroup};

use crate::context::{ExecutionContext, GroupResources, StdinHandle};
use crate::errors::{ConductorError, Result};
use crate::fs::{FileSystem, RealFileSystem};
use crate::linker::link_with_fs;
use crate::output::OutputSink;
use crate::process::{ProcessDefinition, ProcessEvent, ProcessStatus};
use crate::terminate::{platform_terminator, Terminator};

/// Collaborators a run group is built with. `Default` uses the platform
/// terminator, the process's stdout and the real filesystem.
#[derive(Debug, Clone)]
pub struct GroupOptions {
    pub terminator: Arc<dyn Terminator>,
    pub sink: OutputSink,
    pub fs: Arc<dyn FileSystem>,
}

impl Default for GroupOptions {
    fn default() -> Self {
        Self {
            terminator: platform_terminator(),
            sink: OutputSink::stdout(),
            fs: Arc::new(RealFileSystem),
        }
    }
}

#[derive(Debug)]
pub struct RunGroup {
    contexts: Vec<ExecutionContext>,
    buzzkill: Buzzkill,
    wait_group: WaitGroup,
}

impl RunGroup {
    /// Build and link a group with default options.
    ///
    /// Must be called from within a Tokio runtime: linking spawns the
    /// trigger watchers.
    pub fn new(definitions: Vec<ProcessDefinition>) -> Result<Self> {
        Self::with_options(definitions, GroupOptions::default())
    }

    /// Build one context per definition and link them.
    ///
    /// A link error is returned before any process is launched.
    pub fn with_options(definitions: Vec<ProcessDefinition>, options: GroupOptions) -> Result<Self> {
        let buzzkill = Buzzkill::new();
        let resources = GroupResources {
            buzzkill: buzzkill.clone(),
            terminator: options.terminator,
            sink: options.sink,
        };

        let mut contexts: Vec<ExecutionContext> = definitions
            .into_iter()
            .map(|def| ExecutionContext::new(def, &resources))
            .collect();

        link_with_fs(&mut contexts, options.fs.as_ref())?;

        Ok(Self {
            contexts,
            buzzkill,
            wait_group: WaitGroup::new(),
        })
    }

    /// Start every context's run loop.
    pub fn start(&mut self) {
        info!(processes = self.contexts.len(), "starting run group");
        for ctx in self.contexts.iter_mut() {
            ctx.start(&self.wait_group);
        }
    }

    /// Buzzkill the whole group from outside (e.g. Ctrl-C).
    pub fn request_stop(&self) {
        self.buzzkill.fire("external stop request");
    }

    /// Who buzzkilled the group, if anyone did.
    pub fn buzzkill_origin(&self) -> Option<String> {
        self.buzzkill.origin()
    }

    /// A cloneable handle that can stop the group from another task.
    pub fn buzzkill(&self) -> Buzzkill {
        self.buzzkill.clone()
    }

    /// Wait until every started context has finished.
    pub async fn wait(&self) {
        self.wait_group.wait().await;
    }

    /// Wait for completion, then for every run loop task to return.
    pub async fn join(&mut self) {
        self.wait_group.wait().await;
        for ctx in self.contexts.iter_mut() {
            ctx.join().await;
        }
    }

    pub fn contexts(&self) -> &[ExecutionContext] {
        &self.contexts
    }

    pub fn context(&self, name: &str) -> Option<&ExecutionContext> {
        self.contexts.iter().find(|c| c.name() == name)
    }

    fn require(&self, name: &str) -> Result<&ExecutionContext> {
        self.context(name)
            .ok_or_else(|| ConductorError::ProcessNotFound(name.to_string()))
    }

    pub fn subscribe(&self, name: &str) -> Result<broadcast::Receiver<ProcessEvent>> {
        Ok(self.require(name)?.subscribe())
    }

    pub fn status(&self, name: &str) -> Option<ProcessStatus> {
        self.context(name).map(|c| c.status())
    }

    /// Forward `text` to the stdin of the named process.
    pub async fn write(&self, name: &str, text: impl Into<String>) -> Result<()> {
        self.require(name)?.write(text).await
    }

    /// Stdin handle of the named process, usable after the group is moved
    /// into another task.
    pub fn stdin(&self, name: &str) -> Result<StdinHandle> {
        Ok(self.require(name)?.stdin())
    }

    /// Current status of every process, in definition order.
    pub fn summary(&self) -> Vec<(String, ProcessStatus)> {
        self.contexts
            .iter()
            .map(|c| (c.name().to_string(), c.status()))
            .collect()
    }
}

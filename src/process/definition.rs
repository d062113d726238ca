// src/process/definition.rs

//! Immutable process definitions.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::types::{ExitPolicy, RestartAttempts};

/// Default grace period between a graceful stop and a forced kill.
pub const DEFAULT_TIMEOUT_ON_EXIT: Duration = Duration::from_secs(5);

/// Filesystem trigger configuration.
///
/// A process with a non-empty `watch` set waits for a matching change
/// before each run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FsTrigger {
    /// Paths (files or directories) watched recursively.
    pub watch: BTreeSet<PathBuf>,
    /// Exact paths, or base-name globs, that never trigger.
    pub ignore: BTreeSet<PathBuf>,
    /// Base-name globs that do trigger.
    pub contain_filters: BTreeSet<String>,
}

impl FsTrigger {
    pub fn is_active(&self) -> bool {
        !self.watch.is_empty()
    }
}

/// Inter-process trigger configuration: names of the processes whose
/// start, successful completion or failure launches this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessTrigger {
    pub on_start: BTreeSet<String>,
    pub on_complete: BTreeSet<String>,
    pub on_error: BTreeSet<String>,
}

impl ProcessTrigger {
    pub fn is_active(&self) -> bool {
        !(self.on_start.is_empty() && self.on_complete.is_empty() && self.on_error.is_empty())
    }

    /// Every `(kind, target)` edge declared by this trigger.
    pub fn edges(&self) -> impl Iterator<Item = (TriggerKind, &str)> {
        self.on_start
            .iter()
            .map(|t| (TriggerKind::OnStart, t.as_str()))
            .chain(
                self.on_complete
                    .iter()
                    .map(|t| (TriggerKind::OnComplete, t.as_str())),
            )
            .chain(self.on_error.iter().map(|t| (TriggerKind::OnError, t.as_str())))
    }
}

/// Which event of a target process fires a process trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerKind {
    OnStart,
    OnComplete,
    OnError,
}

impl TriggerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::OnStart => "on_start",
            TriggerKind::OnComplete => "on_complete",
            TriggerKind::OnError => "on_error",
        }
    }
}

/// One process of a run group, as configured. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDefinition {
    pub name: String,
    pub command: String,
    pub args: Vec<String>,

    pub prefix: String,
    /// ANSI escape sequence used to color the prefix, if any.
    pub color: Option<String>,
    pub display_pid: bool,
    pub show_timestamp: bool,
    pub separate_new_lines: bool,
    pub silent: bool,

    pub start_delay: Duration,
    pub on_failure: ExitPolicy,
    pub on_complete: ExitPolicy,
    pub restart_attempts: RestartAttempts,
    pub restart_delay: Duration,
    pub timeout_on_exit: Duration,
    /// Sent once to stdin right after the first launch.
    pub start_stream: Option<String>,

    pub fs_trigger: FsTrigger,
    pub process_trigger: ProcessTrigger,
}

impl ProcessDefinition {
    /// A definition with every optional field at its default.
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            prefix: name.clone(),
            name,
            command: command.into(),
            args: Vec::new(),
            color: None,
            display_pid: false,
            show_timestamp: false,
            separate_new_lines: true,
            silent: false,
            start_delay: Duration::ZERO,
            on_failure: ExitPolicy::Wait,
            on_complete: ExitPolicy::Wait,
            restart_attempts: RestartAttempts::Never,
            restart_delay: Duration::ZERO,
            timeout_on_exit: DEFAULT_TIMEOUT_ON_EXIT,
            start_stream: None,
            fs_trigger: FsTrigger::default(),
            process_trigger: ProcessTrigger::default(),
        }
    }

    /// Whether the command waits for a trigger instead of starting right away.
    pub fn is_triggered(&self) -> bool {
        self.fs_trigger.is_active() || self.process_trigger.is_active()
    }

    /// Whether any exit can lead to a restart.
    pub fn may_restart(&self) -> bool {
        (self.on_complete == ExitPolicy::Restart || self.on_failure == ExitPolicy::Restart)
            && self.restart_attempts.allows_restart()
    }

    /// Policy applied after an attempt exited with `success`.
    pub fn policy_for(&self, success: bool) -> ExitPolicy {
        if success {
            self.on_complete
        } else {
            self.on_failure
        }
    }
}

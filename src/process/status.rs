// src/process/status.rs

use std::fmt;

/// Lifecycle status of one process.
///
/// `Exited` and `Failed` are terminal for an attempt. A trigger-gated process
/// can leave them again by going back to `WaitingTrigger`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    NotStarted,
    WaitingTrigger,
    Running,
    Restarting,
    Exited,
    Failed,
}

impl ProcessStatus {
    pub fn is_terminal(&self) -> bool {
        match self {
            ProcessStatus::Exited | ProcessStatus::Failed => true,
            ProcessStatus::NotStarted
            | ProcessStatus::WaitingTrigger
            | ProcessStatus::Running
            | ProcessStatus::Restarting => false,
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessStatus::NotStarted => "not-started",
            ProcessStatus::WaitingTrigger => "waiting-trigger",
            ProcessStatus::Running => "running",
            ProcessStatus::Restarting => "restarting",
            ProcessStatus::Exited => "exited",
            ProcessStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Notifications published by an execution context, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessEvent {
    /// The status changed.
    Status(ProcessStatus),
    /// An attempt ended on its own with this exit code (-1 when the process
    /// could not be spawned or was killed by a signal). Published before the
    /// exit policy is applied.
    ExitCode(i32),
    /// The context reached its final state and signaled group completion.
    /// Nothing follows this event.
    Finished,
}

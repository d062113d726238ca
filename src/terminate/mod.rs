// src/terminate/mod.rs

//! Platform-specific process termination.
//!
//! The engine only talks to the [`Terminator`] trait. [`platform_terminator`]
//! picks the implementation for the current OS at build time:
//!
//! - [`unix::SignalTerminator`] sends `SIGINT` / `SIGKILL` via `nix`.
//! - [`windows::TaskkillTerminator`] shells out to `taskkill`.
//!
//! Tests can wrap or replace the terminator to observe calls.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::errors::Result;

#[cfg(unix)]
pub mod unix;
#[cfg(windows)]
pub mod windows;

/// How many times a failed graceful signal is retried before force-killing.
pub const SIGNAL_RETRIES: u32 = 3;
/// Pause between graceful signal retries.
pub const SIGNAL_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// Capability to stop an OS process.
pub trait Terminator: Send + Sync + Debug {
    /// Send the platform's graceful interrupt once.
    fn interrupt(&self, pid: u32) -> Result<()>;

    /// Kill the process outright. Killing a process that already exited is
    /// not an error.
    fn force_kill(&self, pid: u32) -> Result<()>;
}

/// Ask `pid` to stop gracefully.
///
/// A failed signal send is retried up to [`SIGNAL_RETRIES`] times; if it
/// still fails the process is force-killed. Waiting for the process to
/// actually exit is the caller's job.
pub async fn graceful_stop(terminator: &dyn Terminator, pid: u32) -> Result<()> {
    let mut last_err = None;
    for attempt in 0..=SIGNAL_RETRIES {
        match terminator.interrupt(pid) {
            Ok(()) => {
                debug!(pid, attempt, "graceful stop signal sent");
                return Ok(());
            }
            Err(e) => {
                debug!(pid, attempt, error = %e, "graceful stop signal failed");
                last_err = Some(e);
                if attempt < SIGNAL_RETRIES {
                    tokio::time::sleep(SIGNAL_RETRY_BACKOFF).await;
                }
            }
        }
    }

    if let Some(e) = last_err {
        warn!(pid, error = %e, "graceful stop failed; force killing");
    }
    terminator.force_kill(pid)
}

/// The terminator for the current platform.
pub fn platform_terminator() -> Arc<dyn Terminator> {
    #[cfg(unix)]
    {
        Arc::new(unix::SignalTerminator)
    }
    #[cfg(windows)]
    {
        Arc::new(windows::TaskkillTerminator)
    }
}

// src/terminate/unix.rs

use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use tracing::debug;

use super::Terminator;
use crate::errors::{ConductorError, Result};

/// `SIGINT` for graceful stops, `SIGKILL` for forced ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalTerminator;

fn send(pid: u32, sig: Signal) -> Result<()> {
    let raw = i32::try_from(pid).map_err(|_| ConductorError::Signal {
        pid,
        reason: "pid out of range".to_string(),
    })?;

    match signal::kill(Pid::from_raw(raw), sig) {
        Ok(()) => Ok(()),
        Err(Errno::ESRCH) => {
            debug!(pid, signal = sig.as_str(), "process already gone");
            Ok(())
        }
        Err(e) => Err(ConductorError::Signal {
            pid,
            reason: e.to_string(),
        }),
    }
}

impl Terminator for SignalTerminator {
    fn interrupt(&self, pid: u32) -> Result<()> {
        send(pid, Signal::SIGINT)
    }

    fn force_kill(&self, pid: u32) -> Result<()> {
        send(pid, Signal::SIGKILL)
    }
}

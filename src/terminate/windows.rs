// src/terminate/windows.rs

use std::process::{Command, Stdio};

use super::Terminator;
use crate::errors::{ConductorError, Result};

/// `taskkill` exits with 128 when the pid does not exist.
const TASKKILL_NOT_FOUND: i32 = 128;

/// Plain `taskkill` for graceful stops, `taskkill /T /F` for forced ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskkillTerminator;

fn taskkill(pid: u32, force: bool) -> Result<()> {
    let mut cmd = Command::new("taskkill");
    if force {
        cmd.args(["/T", "/F"]);
    }
    cmd.arg("/PID")
        .arg(pid.to_string())
        .stdout(Stdio::null())
        .stderr(Stdio::null());

    let status = cmd.status()?;
    match status.code() {
        Some(0) => Ok(()),
        Some(TASKKILL_NOT_FOUND) => Ok(()),
        other => Err(ConductorError::Signal {
            pid,
            reason: format!("taskkill exited with {other:?}"),
        }),
    }
}

impl Terminator for TaskkillTerminator {
    fn interrupt(&self, pid: u32) -> Result<()> {
        taskkill(pid, false)
    }

    fn force_kill(&self, pid: u32) -> Result<()> {
        taskkill(pid, true)
    }
}

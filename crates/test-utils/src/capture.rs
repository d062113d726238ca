use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use conductor::errors::Result;
use conductor::output::OutputSink;
use conductor::terminate::{platform_terminator, Terminator};

/// An output sink that keeps everything written to it in memory.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sink(&self) -> OutputSink {
        OutputSink::from_writer(self.clone())
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminatorCall {
    Interrupt(u32),
    ForceKill(u32),
}

/// Wraps the platform terminator and records every call made through it.
#[derive(Debug, Clone)]
pub struct RecordingTerminator {
    inner: Arc<dyn Terminator>,
    calls: Arc<Mutex<Vec<TerminatorCall>>>,
}

impl Default for RecordingTerminator {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingTerminator {
    pub fn new() -> Self {
        Self::wrapping(platform_terminator())
    }

    pub fn wrapping(inner: Arc<dyn Terminator>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<TerminatorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn force_kills(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, TerminatorCall::ForceKill(_)))
            .count()
    }
}

impl Terminator for RecordingTerminator {
    fn interrupt(&self, pid: u32) -> Result<()> {
        self.calls.lock().unwrap().push(TerminatorCall::Interrupt(pid));
        self.inner.interrupt(pid)
    }

    fn force_kill(&self, pid: u32) -> Result<()> {
        self.calls.lock().unwrap().push(TerminatorCall::ForceKill(pid));
        self.inner.force_kill(pid)
    }
}

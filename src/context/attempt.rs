// src/context/attempt.rs

//! One launch of a context's OS process.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::runner::Runner;
use crate::errors::{ConductorError, Result};
use crate::process::{ProcessEvent, ProcessStatus};
use crate::terminate::graceful_stop;

/// How long to keep draining stdout/stderr after the process is gone.
///
/// Grandchildren that inherited the pipes can keep them open forever.
const OUTPUT_DRAIN_TIMEOUT: Duration = Duration::from_millis(500);

/// How a single attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptEnd {
    /// The process exited on its own (or never spawned, with code -1).
    Exited { code: i32 },
    /// The group was buzzkilled and the process was stopped.
    Cancelled,
}

impl Runner {
    /// Spawn the process and supervise it until it exits or is cancelled.
    ///
    /// Publishes `Running` on launch and, for a natural exit, the final
    /// status followed by the exit code. Nothing is published for the exit
    /// policy; that is the caller's business.
    pub(crate) async fn attempt(&mut self) -> AttemptEnd {
        let name = self.definition.name.clone();

        if self.cancel.is_cancelled() {
            self.set_status(ProcessStatus::Exited);
            return AttemptEnd::Cancelled;
        }

        let mut child = match self.spawn_child() {
            Ok(child) => child,
            Err(e) => {
                error!(process = %name, error = %e, "process did not start");
                self.set_status(ProcessStatus::NotStarted);
                self.published.emit(ProcessEvent::ExitCode(-1));
                return AttemptEnd::Exited { code: -1 };
            }
        };

        let pid = child.id();
        self.published.pid.send_replace(pid);
        self.set_status(ProcessStatus::Running);
        info!(process = %name, pid, command = %self.definition.command, "process started");

        let pumps = self.spawn_output_pumps(&mut child, pid);

        // Writes go through their own task so a child that never reads
        // stdin cannot keep this loop from seeing cancellation or exit.
        let (stdin_feed, stdin_writer) = spawn_stdin_writer(child.stdin.take(), name.clone());
        if let Some(text) = self.start_stream.take() {
            let _ = stdin_feed.send(StdinWrite { text, reply: None });
        }

        let end = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    info!(process = %name, pid, "cancellation received; stopping process");
                    self.stop_child(&mut child, pid).await;
                    break AttemptEnd::Cancelled;
                }
                res = child.wait() => {
                    let code = match res {
                        Ok(status) => status.code().unwrap_or(-1),
                        Err(e) => {
                            warn!(process = %name, error = %e, "failed to collect exit status");
                            -1
                        }
                    };
                    break AttemptEnd::Exited { code };
                }
                Some(req) = self.stdin_rx.recv() => {
                    let write = StdinWrite { text: req.text, reply: Some(req.reply) };
                    if let Err(mpsc::error::SendError(write)) = stdin_feed.send(write) {
                        if let Some(reply) = write.reply {
                            let _ = reply.send(Err(ConductorError::NotRunning(name.clone())));
                        }
                    }
                }
            }
        };

        // The process is gone; a write still in flight can only block.
        drop(stdin_feed);
        stdin_writer.abort();
        self.reject_pending_writes();
        finish_output(&name, pumps).await;
        self.published.pid.send_replace(None);

        match end {
            AttemptEnd::Cancelled => {
                self.set_status(ProcessStatus::Exited);
            }
            AttemptEnd::Exited { code } => {
                info!(process = %name, pid, exit_code = code, success = code == 0, "process exited");
                let status = if code == 0 {
                    ProcessStatus::Exited
                } else {
                    ProcessStatus::Failed
                };
                self.set_status(status);
                self.published.emit(ProcessEvent::ExitCode(code));
            }
        }

        end
    }

    fn spawn_child(&self) -> Result<Child> {
        let mut cmd = Command::new(&self.definition.command);
        cmd.args(&self.definition.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd.spawn().map_err(|source| ConductorError::Spawn {
            process: self.definition.name.clone(),
            command: self.definition.command.clone(),
            source,
        })
    }

    fn spawn_output_pumps(&self, child: &mut Child, pid: Option<u32>) -> Vec<JoinHandle<()>> {
        let mut pumps = Vec::with_capacity(2);
        if let Some(stdout) = child.stdout.take() {
            let writer = self.output.clone();
            pumps.push(tokio::spawn(async move {
                writer.pump(stdout, pid, "stdout").await;
            }));
        }
        if let Some(stderr) = child.stderr.take() {
            let writer = self.output.clone();
            pumps.push(tokio::spawn(async move {
                writer.pump(stderr, pid, "stderr").await;
            }));
        }
        pumps
    }

    /// Graceful stop, bounded by `timeout_on_exit`, then a forced kill.
    async fn stop_child(&self, child: &mut Child, pid: Option<u32>) {
        let name = &self.definition.name;
        let grace = self.definition.timeout_on_exit;

        if let Some(pid) = pid {
            if let Err(e) = graceful_stop(self.terminator.as_ref(), pid).await {
                warn!(process = %name, pid, error = %e, "graceful stop failed");
            }

            match timeout(grace, child.wait()).await {
                Ok(Ok(status)) => {
                    debug!(process = %name, pid, ?status, "process stopped gracefully");
                    return;
                }
                Ok(Err(e)) => {
                    warn!(process = %name, pid, error = %e, "failed to wait for stopping process");
                }
                Err(_) => {
                    warn!(
                        process = %name,
                        pid,
                        timeout_ms = grace.as_millis() as u64,
                        "process ignored graceful stop; force killing"
                    );
                }
            }

            if let Err(e) = self.terminator.force_kill(pid) {
                warn!(process = %name, pid, error = %e, "force kill failed");
            }
        }

        // Reaps the child; also covers a failed force kill.
        if let Err(e) = child.kill().await {
            debug!(process = %name, error = %e, "final kill of child failed");
        }
    }

    /// Fail writes that were queued for a process that is gone.
    pub(crate) fn reject_pending_writes(&mut self) {
        while let Ok(req) = self.stdin_rx.try_recv() {
            let _ = req
                .reply
                .send(Err(ConductorError::NotRunning(self.definition.name.clone())));
        }
    }
}

/// One queued write for the stdin writer task. `reply` is `None` for the
/// start stream.
struct StdinWrite {
    text: String,
    reply: Option<oneshot::Sender<Result<()>>>,
}

/// Own the child's stdin and write queued text to it in order. Dropping
/// the task closes the pipe and fails every reply still waiting.
fn spawn_stdin_writer(
    stdin: Option<ChildStdin>,
    name: String,
) -> (mpsc::UnboundedSender<StdinWrite>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<StdinWrite>();
    let task = tokio::spawn(async move {
        let mut stdin = stdin;
        while let Some(write) = rx.recv().await {
            let res = write_stdin(&mut stdin, &name, &write.text).await;
            match write.reply {
                Some(reply) => {
                    let _ = reply.send(res);
                }
                None => {
                    if let Err(e) = res {
                        warn!(process = %name, error = %e, "failed to send start stream");
                    }
                }
            }
        }
    });
    (tx, task)
}

async fn write_stdin(stdin: &mut Option<ChildStdin>, name: &str, text: &str) -> Result<()> {
    let pipe = stdin
        .as_mut()
        .ok_or_else(|| ConductorError::NotRunning(name.to_string()))?;

    let to_err = |source| ConductorError::StdinWrite {
        process: name.to_string(),
        source,
    };
    pipe.write_all(text.as_bytes()).await.map_err(to_err)?;
    pipe.flush().await.map_err(to_err)?;
    Ok(())
}

async fn finish_output(name: &str, pumps: Vec<JoinHandle<()>>) {
    for pump in pumps {
        match timeout(OUTPUT_DRAIN_TIMEOUT, pump).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!(process = %name, error = %e, "output task failed"),
            Err(_) => debug!(process = %name, "output still open after exit; detaching"),
        }
    }
}

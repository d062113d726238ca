// src/output/writer.rs

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tracing::debug;

use crate::process::ProcessDefinition;

const ANSI_RESET: &str = "\x1b[0m";
const CHUNK_SIZE: usize = 8192;

/// Shared destination for formatted output lines.
///
/// Every writer in a run group shares one sink so lines from different
/// processes never interleave mid-line.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

impl OutputSink {
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    pub fn from_writer<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output sink mutex poisoned"))?;
        guard.write_all(bytes)?;
        guard.flush()
    }
}

/// Formats one process's stdout/stderr and forwards it to the sink.
///
/// Each line is prefixed with (in order) an optional timestamp, the prefix,
/// and an optional `(pid)`; the header is colored when a color is set.
/// A silent writer still drains its input but writes nothing.
#[derive(Debug, Clone)]
pub struct OutputWriter {
    prefix: String,
    color: Option<String>,
    display_pid: bool,
    show_timestamp: bool,
    separate_new_lines: bool,
    silent: bool,
    sink: OutputSink,
}

impl OutputWriter {
    pub fn from_definition(def: &ProcessDefinition, sink: OutputSink) -> Self {
        Self {
            prefix: def.prefix.clone(),
            color: def.color.clone(),
            display_pid: def.display_pid,
            show_timestamp: def.show_timestamp,
            separate_new_lines: def.separate_new_lines,
            silent: def.silent,
            sink,
        }
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    fn header(&self, pid: Option<u32>) -> String {
        let mut header = String::new();
        if self.show_timestamp {
            header.push_str(&chrono::Local::now().format("%H:%M:%S%.3f ").to_string());
        }
        header.push_str(&self.prefix);
        if self.display_pid {
            if let Some(pid) = pid {
                header.push_str(&format!("({pid})"));
            }
        }
        header.push_str(" |");

        match &self.color {
            Some(color) => format!("{color}{header}{ANSI_RESET}"),
            None => header,
        }
    }

    /// Render `text` with the header, terminated by a newline.
    pub fn format_line(&self, pid: Option<u32>, text: &str) -> String {
        let text = text.strip_suffix('\n').unwrap_or(text);
        format!("{} {}\n", self.header(pid), text)
    }

    pub fn write_line(&self, pid: Option<u32>, text: &str) -> io::Result<()> {
        if self.silent {
            return Ok(());
        }
        self.sink.write_all(self.format_line(pid, text).as_bytes())
    }

    /// Drain `reader` until EOF, writing everything it produces.
    ///
    /// With `separate_new_lines` each line gets its own header; otherwise
    /// each chunk read from the pipe is written under a single header.
    /// Write errors are logged and never stop the drain.
    pub async fn pump<R>(&self, reader: R, pid: Option<u32>, stream: &'static str)
    where
        R: AsyncRead + Unpin,
    {
        if self.separate_new_lines {
            let mut segments = BufReader::new(reader).split(b'\n');
            loop {
                match segments.next_segment().await {
                    Ok(Some(bytes)) => {
                        let line = String::from_utf8_lossy(&bytes);
                        let line = line.strip_suffix('\r').unwrap_or(&line);
                        self.report(self.write_line(pid, line), stream);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!(prefix = %self.prefix, stream, error = %e, "output read failed");
                        break;
                    }
                }
            }
        } else {
            let mut reader = reader;
            let mut buf = vec![0u8; CHUNK_SIZE];
            loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]);
                        self.report(self.write_line(pid, &chunk), stream);
                    }
                    Err(e) => {
                        debug!(prefix = %self.prefix, stream, error = %e, "output read failed");
                        break;
                    }
                }
            }
        }
        debug!(prefix = %self.prefix, stream, "output stream closed");
    }

    fn report(&self, res: io::Result<()>, stream: &'static str) {
        if let Err(e) = res {
            debug!(prefix = %self.prefix, stream, error = %e, "failed to write process output");
        }
    }
}

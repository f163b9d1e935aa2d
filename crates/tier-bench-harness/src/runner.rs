//! Workload process runner
//!
//! Spawns the instrumented workload and exposes its combined
//! stdout+stderr as one channel of text lines in arrival order. Lines
//! are only complete at a terminator boundary; a chunk may end
//! mid-line, and the remainder is carried until the next chunk or
//! flushed when the stream closes. Termination is graceful: SIGTERM
//! first, SIGKILL after the grace period.

use crate::error::RunError;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the merged line channel
const LINE_CHANNEL_CAPACITY: usize = 1_024;

/// Read buffer size for each output stream
const READ_CHUNK_BYTES: usize = 4_096;

/// A line observed on the workload's output, stamped at arrival
#[derive(Debug, Clone, PartialEq)]
pub struct SourcedLine {
    pub timestamp_millis: i64,
    pub text: String,
}

/// Accumulates raw output chunks and yields complete lines.
///
/// A line is complete at a `\n` boundary (a preceding `\r` is
/// stripped). Bytes after the last terminator stay buffered; `flush`
/// returns them as a final line when the stream ends.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk, returning every line it completed
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if byte == b'\n' {
                if self.pending.last() == Some(&b'\r') {
                    self.pending.pop();
                }
                lines.push(String::from_utf8_lossy(&self.pending).into_owned());
                self.pending.clear();
            } else {
                self.pending.push(byte);
            }
        }
        lines
    }

    /// Drain a dangling partial line at end of stream
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        Some(line)
    }
}

/// Send SIGTERM to a process. Returns `Err` if the signal could not be delivered.
fn send_sigterm(pid: u32) -> Result<(), std::io::Error> {
    let ret = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
    if ret == -1 {
        Err(std::io::Error::last_os_error())
    } else {
        Ok(())
    }
}

/// Handle to a running workload process
#[derive(Debug)]
pub struct WorkloadHandle {
    child: Child,
    pid: u32,
    lines: Option<mpsc::Receiver<SourcedLine>>,
}

impl WorkloadHandle {
    /// Spawn the workload with piped stdout/stderr.
    ///
    /// A spawn error is a startup failure, distinct from a crash of an
    /// already-running process.
    pub fn start<P: AsRef<Path>>(
        executable: P,
        args: &[String],
        env: &[(String, String)],
    ) -> Result<Self, RunError> {
        let executable = executable.as_ref();
        let mut child = Command::new(executable)
            .args(args)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunError::Startup(format!("{}: {}", executable.display(), e)))?;

        let pid = child
            .id()
            .ok_or_else(|| RunError::Startup("workload exited before it was observed".into()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RunError::Startup("failed to capture stdout".into()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| RunError::Startup("failed to capture stderr".into()))?;

        // Both streams feed one channel so interleaving reflects
        // arrival order. Each sender closes at its stream's EOF; the
        // channel closes when both are done.
        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);
        tokio::spawn(pump_stream(stdout, tx.clone()));
        tokio::spawn(pump_stream(stderr, tx));

        debug!(pid, executable = %executable.display(), "workload spawned");

        Ok(Self {
            child,
            pid,
            lines: Some(rx),
        })
    }

    /// Process ID of the workload
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Take ownership of the merged line channel.
    ///
    /// Returns `None` if already taken.
    pub fn take_lines(&mut self) -> Option<mpsc::Receiver<SourcedLine>> {
        self.lines.take()
    }

    /// Wait for the process to exit
    pub async fn wait(&mut self) -> std::io::Result<std::process::ExitStatus> {
        self.child.wait().await
    }

    /// Check whether the process has already exited, without blocking
    pub fn try_status(&mut self) -> Option<std::process::ExitStatus> {
        self.child.try_wait().ok().flatten()
    }

    /// Request graceful termination, escalating to SIGKILL after `grace`.
    ///
    /// Returns the exit status. Remaining buffered output continues to
    /// drain through the line channel until both streams hit EOF.
    pub async fn stop(&mut self, grace: Duration) -> std::io::Result<std::process::ExitStatus> {
        if let Some(status) = self.child.try_wait()? {
            return Ok(status);
        }

        if let Err(e) = send_sigterm(self.pid) {
            warn!(pid = self.pid, error = %e, "failed to deliver SIGTERM");
        }

        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                warn!(
                    pid = self.pid,
                    grace_millis = grace.as_millis() as u64,
                    "workload ignored SIGTERM, killing"
                );
                self.child.kill().await?;
                self.child.wait().await
            }
        }
    }
}

/// Pump one output stream into the shared line channel
async fn pump_stream<R>(mut stream: R, tx: mpsc::Sender<SourcedLine>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut buffer = LineBuffer::new();
    let mut chunk = [0u8; READ_CHUNK_BYTES];

    loop {
        match stream.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => {
                let timestamp = tier_bench_common::timestamp_millis();
                for text in buffer.push_chunk(&chunk[..n]) {
                    if tx
                        .send(SourcedLine {
                            timestamp_millis: timestamp,
                            text,
                        })
                        .await
                        .is_err()
                    {
                        return;
                    }
                }
            }
            Err(e) => {
                debug!(error = %e, "workload output stream read error");
                break;
            }
        }
    }

    // Dangling partial line at process exit flushes as a final line
    if let Some(text) = buffer.flush() {
        let _ = tx
            .send(SourcedLine {
                timestamp_millis: tier_bench_common::timestamp_millis(),
                text,
            })
            .await;
    }
}

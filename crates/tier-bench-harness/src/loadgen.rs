//! Load generator adapter
//!
//! Wraps an external load-generation tool: one invocation per
//! measurement window, producing `Metrics` for a running HTTP target.
//! The harness depends only on the tool's JSON output shape, not on
//! its CLI surface; the expected document is
//!
//! ```json
//! {
//!   "requests_per_sec": 11873.2,
//!   "latency_ms": {"p50": 4.1, "p95": 18.0, "p99": 33.5, "max": 102.0},
//!   "sample_count": 356196,
//!   "duration_ms": 30000,
//!   "throughput_samples": [11532.0, 11904.5, 12183.1]
//! }
//! ```
//!
//! `throughput_samples` (per-interval rates) are optional; without them
//! the significance test is skipped downstream.

use crate::error::RunError;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tier_bench_common::{LatencySummary, Metrics};
use tokio::process::Command;
use tracing::{debug, info};

/// Extra time allowed beyond the requested window before the tool is
/// considered hung
const TOOL_SLACK: Duration = Duration::from_secs(15);

/// One load-generation request
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub url: String,
    pub connections: u32,
    pub duration: Duration,
    pub pipelining: u32,
}

/// JSON document the load tool prints on stdout
#[derive(Debug, Deserialize)]
struct ToolOutput {
    requests_per_sec: f64,
    latency_ms: ToolLatency,
    sample_count: u64,
    duration_ms: u64,
    #[serde(default)]
    throughput_samples: Vec<f64>,
}

#[derive(Debug, Deserialize)]
struct ToolLatency {
    p50: f64,
    p95: f64,
    p99: f64,
    max: f64,
}

impl From<ToolOutput> for Metrics {
    fn from(out: ToolOutput) -> Self {
        Metrics {
            requests_per_sec: out.requests_per_sec,
            latency: LatencySummary {
                p50_ms: out.latency_ms.p50,
                p95_ms: out.latency_ms.p95,
                p99_ms: out.latency_ms.p99,
                max_ms: out.latency_ms.max,
            },
            sample_count: out.sample_count,
            duration_millis: out.duration_ms,
            throughput_samples: out.throughput_samples,
            complete: true,
        }
    }
}

/// Adapter around the configured load-generator executable
#[derive(Debug, Clone)]
pub struct LoadDriver {
    executable: PathBuf,
}

impl LoadDriver {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }

    /// Run one load window and parse the tool's output into `Metrics`.
    ///
    /// Any tool failure (spawn error, non-zero exit, unparseable
    /// output, hang) surfaces as `RunError::LoadGenerator`.
    pub async fn run(&self, request: &LoadRequest) -> Result<Metrics, RunError> {
        info!(
            url = %request.url,
            connections = request.connections,
            duration_secs = request.duration.as_secs(),
            pipelining = request.pipelining,
            "starting load window"
        );

        let child = Command::new(&self.executable)
            .arg("--url")
            .arg(&request.url)
            .arg("--connections")
            .arg(request.connections.to_string())
            .arg("--duration-secs")
            .arg(request.duration.as_secs().to_string())
            .arg("--pipelining")
            .arg(request.pipelining.to_string())
            .arg("--json")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                RunError::LoadGenerator(format!("{}: {}", self.executable.display(), e))
            })?;

        let deadline = request.duration + TOOL_SLACK;
        let output = tokio::time::timeout(deadline, child.wait_with_output())
            .await
            .map_err(|_| {
                RunError::LoadGenerator(format!(
                    "tool did not finish within {}s",
                    deadline.as_secs()
                ))
            })?
            .map_err(|e| RunError::LoadGenerator(format!("failed waiting for tool: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RunError::LoadGenerator(format!(
                "tool exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let parsed: ToolOutput = serde_json::from_slice(&output.stdout).map_err(|e| {
            RunError::LoadGenerator(format!("unparseable tool output: {}", e))
        })?;

        let metrics = Metrics::from(parsed);
        debug!(
            requests_per_sec = metrics.requests_per_sec,
            p95_ms = metrics.latency.p95_ms,
            samples = metrics.throughput_samples.len(),
            "load window complete"
        );
        Ok(metrics)
    }
}

//! tier-bench-common - Shared types for the tier-bench harness
//!
//! This crate provides the value types exchanged between the harness
//! components, without any I/O or async dependencies to keep it
//! lightweight.
//!
//! ## Modules
//!
//! - [`defaults`]: Default configuration values
//! - [`event`]: Trace events parsed from the runtime's diagnostic stream
//! - [`metrics`]: Throughput and latency metrics for one run
//! - [`report`]: The comparison report produced from two runs
//! - [`run_result`]: Per-variant run outcome
//! - [`stats`]: Throughput sample statistics

pub mod defaults;
pub mod event;
pub mod metrics;
pub mod report;
pub mod run_result;
pub mod stats;

// Re-export commonly used types
pub use event::{TraceEvent, TraceEventKind};
pub use metrics::{LatencySummary, Metrics};
pub use report::{ComparisonReport, Deltas, EventDiff, RunSummary, Verdict};
pub use run_result::{ExitStatus, RunResult, Variant};
pub use stats::RateStats;

/// Wall-clock time in milliseconds since the Unix epoch, used to stamp
/// diagnostic lines as they are read from the workload.
///
/// A clock set before the epoch yields 0.
pub fn timestamp_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_millis() as i64,
        Err(_) => 0,
    }
}

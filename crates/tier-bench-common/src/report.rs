//! Comparison report model
//!
//! The one persisted/interchange shape for a two-variant comparison.
//! Console and markdown renderings are lossless projections of this
//! structure's JSON form.

use crate::metrics::Metrics;
use crate::run_result::{ExitStatus, RunResult, Variant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Categorical outcome of comparing two runs under configured thresholds
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Verdict {
    /// Candidate is measurably better on throughput without a latency penalty
    Improved,
    /// Candidate is measurably worse
    Regressed,
    /// Either run failed, the baseline was unusable, or the difference
    /// is not statistically defensible
    #[default]
    Inconclusive,
}

/// Percentage deltas between candidate and baseline.
///
/// `None` when the delta is undefined (failed run or zero baseline rate).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Deltas {
    /// (candidate.rps - baseline.rps) / baseline.rps * 100
    pub throughput_pct: Option<f64>,
    /// Analogous delta for p95 latency; negative means faster
    pub latency_p95_pct: Option<f64>,
}

/// Per-subject event counts on both sides of the comparison
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDiff {
    pub baseline_count: u64,
    pub candidate_count: u64,
}

/// Summary of one run, embedded in the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub variant: Variant,
    pub exit: ExitStatus,
    pub metrics: Metrics,
    /// Event counts grouped by subject identifier
    pub event_counts: BTreeMap<String, u64>,
    /// Diagnostic lines that matched no known grammar
    pub skipped_lines: u64,
    /// Total trace events observed
    pub event_total: u64,
}

impl From<&RunResult> for RunSummary {
    fn from(run: &RunResult) -> Self {
        Self {
            variant: run.variant,
            exit: run.exit,
            metrics: run.metrics.clone(),
            event_counts: run.event_counts(),
            skipped_lines: run.skipped_lines,
            event_total: run.events.len() as u64,
        }
    }
}

/// The complete comparison of a baseline run against a candidate run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub baseline: RunSummary,
    pub candidate: RunSummary,
    pub deltas: Deltas,
    /// Union of subjects across both runs; a subject seen on only one
    /// side appears with a zero count on the other
    pub event_diff: BTreeMap<String, EventDiff>,
    pub verdict: Verdict,
    /// Human-readable annotations (which variant failed and why,
    /// significance notes)
    pub notes: Vec<String>,
}

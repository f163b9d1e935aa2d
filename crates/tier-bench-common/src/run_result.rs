//! Per-variant run outcome
//!
//! A `RunResult` bundles everything one variant's run produced: the
//! ordered trace events, the load metrics, and how the workload process
//! ended. Owned by the orchestrator until handed to correlation.

use crate::event::TraceEvent;
use crate::metrics::Metrics;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One of the two comparable workload configurations
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Variant {
    Baseline,
    Candidate,
}

/// How the workload process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "code", rename_all = "snake_case")]
pub enum ExitStatus {
    /// Process ran to the end of the run and stopped cleanly
    Success,
    /// Process exited with a non-zero status (or was killed by a signal,
    /// reported as -1)
    Crashed(i32),
    /// The run exceeded its time budget and was cancelled
    TimedOut,
    /// Process could not be spawned at all; no run took place
    FailedToStart,
}

impl ExitStatus {
    /// Whether the run completed without failure
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Result of running one variant: events, metrics, and exit state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Which variant this run measured
    pub variant: Variant,
    /// Trace events in the order their lines were observed
    pub events: Vec<TraceEvent>,
    /// Load metrics; incomplete if the run failed
    pub metrics: Metrics,
    /// How the workload process ended
    pub exit: ExitStatus,
    /// Diagnostic lines that matched no known grammar
    pub skipped_lines: u64,
}

impl RunResult {
    /// Create a successful, finalized run result
    pub fn completed(
        variant: Variant,
        events: Vec<TraceEvent>,
        metrics: Metrics,
        skipped_lines: u64,
    ) -> Self {
        Self {
            variant,
            events,
            metrics,
            exit: ExitStatus::Success,
            skipped_lines,
        }
    }

    /// Create a failed run result. Events parsed before the failure are
    /// retained; metrics are marked incomplete.
    pub fn failed(
        variant: Variant,
        events: Vec<TraceEvent>,
        exit: ExitStatus,
        skipped_lines: u64,
    ) -> Self {
        debug_assert!(!exit.is_success());
        Self {
            variant,
            events,
            metrics: Metrics::incomplete(),
            exit,
            skipped_lines,
        }
    }

    /// Whether this run may contribute metrics to the comparison
    pub fn is_success(&self) -> bool {
        self.exit.is_success() && self.metrics.is_usable()
    }

    /// Count events per subject identifier
    pub fn event_counts(&self) -> BTreeMap<String, u64> {
        let mut counts = BTreeMap::new();
        for event in &self.events {
            *counts.entry(event.subject.clone()).or_insert(0) += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::TraceEventKind;

    fn event(subject: &str, sequence: u64) -> TraceEvent {
        TraceEvent::new(TraceEventKind::Deoptimize, subject, "test", sequence, 0)
    }

    #[test]
    fn test_variant_parse() {
        assert_eq!("baseline".parse::<Variant>().unwrap(), Variant::Baseline);
        assert_eq!("Candidate".parse::<Variant>().unwrap(), Variant::Candidate);
        assert!("other".parse::<Variant>().is_err());
    }

    #[test]
    fn test_failed_run_has_incomplete_metrics() {
        let result = RunResult::failed(
            Variant::Candidate,
            vec![event("foo", 0)],
            ExitStatus::Crashed(1),
            2,
        );
        assert!(!result.is_success());
        assert!(!result.metrics.is_usable());
        // Events observed before the crash are retained
        assert_eq!(result.events.len(), 1);
    }

    #[test]
    fn test_event_counts() {
        let result = RunResult::completed(
            Variant::Baseline,
            vec![event("foo", 0), event("bar", 1), event("foo", 2)],
            Metrics::incomplete(),
            0,
        );
        let counts = result.event_counts();
        assert_eq!(counts["foo"], 2);
        assert_eq!(counts["bar"], 1);
    }

    #[test]
    fn test_exit_status_serialization() {
        let json = serde_json::to_string(&ExitStatus::Crashed(1)).unwrap();
        assert!(json.contains("\"status\":\"crashed\""));
        assert!(json.contains("\"code\":1"));

        let parsed: ExitStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, ExitStatus::Crashed(1));

        // A spawn failure is distinguishable from a crash in the
        // serialized report, not just in the notes
        let json = serde_json::to_string(&ExitStatus::FailedToStart).unwrap();
        assert!(json.contains("\"status\":\"failed_to_start\""));
        assert_ne!(json, serde_json::to_string(&ExitStatus::Crashed(-1)).unwrap());
    }
}

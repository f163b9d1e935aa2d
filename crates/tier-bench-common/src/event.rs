//! Trace events derived from the runtime's diagnostic output
//!
//! One `TraceEvent` corresponds to one recognized line of the tiered
//! compiler's diagnostic stream. Events are immutable once parsed and
//! ordered by their `sequence` index within a run.

use serde::{Deserialize, Serialize};

/// Kind of optimization-related state change reported by the runtime
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
    strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TraceEventKind {
    /// The compiler finished optimizing a code unit
    Optimize,
    /// The compiler discarded optimized code for a code unit
    Deoptimize,
    /// An inline cache changed state (e.g., monomorphic to polymorphic)
    InlineCacheTransition,
}

/// A structured record derived from a single diagnostic line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// What happened
    pub kind: TraceEventKind,
    /// Stable identifier of the affected code unit (name + source location)
    pub subject: String,
    /// Free-text classification supplied by the runtime
    pub reason: String,
    /// Monotonic order index within the run, strictly increasing
    pub sequence: u64,
    /// Wall-clock time the originating line was observed
    pub timestamp_millis: i64,
}

impl TraceEvent {
    /// Create a new trace event
    pub fn new(
        kind: TraceEventKind,
        subject: impl Into<String>,
        reason: impl Into<String>,
        sequence: u64,
        timestamp_millis: i64,
    ) -> Self {
        Self {
            kind,
            subject: subject.into(),
            reason: reason.into(),
            sequence,
            timestamp_millis,
        }
    }
}

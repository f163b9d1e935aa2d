//! Throughput and latency metrics for a single measurement window
//!
//! Produced once per run by the load driver adapter. Metrics from a
//! failed run are marked incomplete and must never feed delta
//! computation.

use serde::{Deserialize, Serialize};

/// Latency percentiles in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub max_ms: f64,
}

/// Metrics for one measurement window against one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Mean request rate over the measurement window
    pub requests_per_sec: f64,
    /// Latency percentiles observed by the load generator
    pub latency: LatencySummary,
    /// Number of requests the percentiles were computed from
    pub sample_count: u64,
    /// Length of the measurement window
    pub duration_millis: u64,
    /// Per-interval request rates, used for the significance test.
    /// May be empty when the load generator reports only aggregates.
    #[serde(default)]
    pub throughput_samples: Vec<f64>,
    /// False when the run failed before the window completed
    pub complete: bool,
}

impl Metrics {
    /// Placeholder metrics for a run that failed before measurement
    /// completed. Carries no usable numbers and is excluded from deltas.
    pub fn incomplete() -> Self {
        Self {
            requests_per_sec: 0.0,
            latency: LatencySummary::default(),
            sample_count: 0,
            duration_millis: 0,
            throughput_samples: Vec::new(),
            complete: false,
        }
    }

    /// Whether these metrics may be used to compute deltas
    pub fn is_usable(&self) -> bool {
        self.complete
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::incomplete()
    }
}

//! Harness configuration
//!
//! Loaded from a JSON file and/or overridden by CLI flags. Composed of
//! focused sub-configs; every knob has an explicit default in
//! `tier_bench_common::defaults`.

use crate::error::ConfigError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use tier_bench_common::defaults::{
    default_bootstrap_iterations, default_connections, default_grace_millis,
    default_improve_threshold_pct, default_latency_guard_pct, default_measure_secs,
    default_pipelining, default_regress_threshold_pct, default_retries, default_run_timeout_secs,
    default_total_budget_secs, default_warmup_secs,
};

/// Workload under test: one executable, two variant selectors
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Path to the instrumented workload executable
    pub executable: String,

    /// Argument selecting the baseline variant
    #[serde(default = "WorkloadConfig::default_baseline_arg")]
    pub baseline_arg: String,

    /// Argument selecting the candidate variant
    #[serde(default = "WorkloadConfig::default_candidate_arg")]
    pub candidate_arg: String,

    /// URL of the workload's HTTP endpoint once ready
    pub url: String,

    /// Extra environment variables passed to the workload
    #[serde(default)]
    pub env: Vec<(String, String)>,
}

impl WorkloadConfig {
    fn default_baseline_arg() -> String {
        "baseline".to_string()
    }

    fn default_candidate_arg() -> String {
        "candidate".to_string()
    }
}

/// Load generator invocation parameters
#[derive(Debug, Clone, Deserialize)]
pub struct LoadConfig {
    /// Path to the load generator executable
    pub executable: String,

    /// Concurrent connections during measurement
    #[serde(default = "default_connections")]
    pub connections: u32,

    /// HTTP pipelining factor
    #[serde(default = "default_pipelining")]
    pub pipelining: u32,

    /// Warm-up duration in seconds (0 skips warm-up)
    #[serde(default = "default_warmup_secs")]
    pub warmup_secs: u64,

    /// Measurement window in seconds
    #[serde(default = "default_measure_secs")]
    pub measure_secs: u64,
}

/// Upper bound on startup-failure retries
pub const MAX_RETRIES: u32 = 10;

/// Timeouts, grace periods, and retry policy
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Per-run timeout in seconds
    #[serde(default = "default_run_timeout_secs")]
    pub run_timeout_secs: u64,

    /// Grace period before escalating SIGTERM to SIGKILL
    #[serde(default = "default_grace_millis")]
    pub grace_millis: u64,

    /// Retries permitted for startup-class failures
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Total wall-clock budget for the whole comparison
    #[serde(default = "default_total_budget_secs")]
    pub total_budget_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            run_timeout_secs: default_run_timeout_secs(),
            grace_millis: default_grace_millis(),
            retries: default_retries(),
            total_budget_secs: default_total_budget_secs(),
        }
    }
}

/// Verdict classification thresholds
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Thresholds {
    /// Minimum throughput gain (percent) to call the candidate improved
    #[serde(default = "default_improve_threshold_pct")]
    pub improve_pct: f64,

    /// Throughput loss (percent, negative) to call the candidate regressed
    #[serde(default = "default_regress_threshold_pct")]
    pub regress_pct: f64,

    /// Tolerated p95 latency worsening (percent)
    #[serde(default = "default_latency_guard_pct")]
    pub latency_guard_pct: f64,

    /// Bootstrap iterations for the significance test
    #[serde(default = "default_bootstrap_iterations")]
    pub bootstrap_iterations: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            improve_pct: default_improve_threshold_pct(),
            regress_pct: default_regress_threshold_pct(),
            latency_guard_pct: default_latency_guard_pct(),
            bootstrap_iterations: default_bootstrap_iterations(),
        }
    }
}

/// Configuration for one comparison run
#[derive(Debug, Clone, Deserialize)]
pub struct HarnessConfig {
    pub workload: WorkloadConfig,
    pub load: LoadConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl HarnessConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|e| ConfigError::io(path.display().to_string(), e))?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workload.executable.is_empty() {
            return Err(ConfigError::EmptyWorkloadExecutable);
        }
        if self.workload.url.is_empty() {
            return Err(ConfigError::EmptyUrl);
        }
        if self.load.executable.is_empty() {
            return Err(ConfigError::EmptyLoadExecutable);
        }
        if self.load.measure_secs == 0 {
            return Err(ConfigError::InvalidMeasureWindow);
        }
        if self.load.connections == 0 {
            return Err(ConfigError::InvalidConnections);
        }
        if self.load.pipelining == 0 {
            return Err(ConfigError::InvalidPipelining);
        }
        if self.limits.run_timeout_secs == 0 {
            return Err(ConfigError::InvalidRunTimeout);
        }
        if self.limits.total_budget_secs < self.limits.run_timeout_secs {
            return Err(ConfigError::BudgetTooSmall {
                budget: self.limits.total_budget_secs,
                run_timeout: self.limits.run_timeout_secs,
            });
        }
        if self.limits.retries > MAX_RETRIES {
            return Err(ConfigError::RetriesTooLarge {
                retries: self.limits.retries,
                max: MAX_RETRIES,
            });
        }
        if self.thresholds.improve_pct <= 0.0 {
            return Err(ConfigError::InvalidImproveThreshold(
                self.thresholds.improve_pct,
            ));
        }
        if self.thresholds.regress_pct >= 0.0 {
            return Err(ConfigError::InvalidRegressThreshold(
                self.thresholds.regress_pct,
            ));
        }
        Ok(())
    }

    /// Grace period as a `Duration`
    pub fn grace(&self) -> Duration {
        Duration::from_millis(self.limits.grace_millis)
    }

    /// Per-run timeout as a `Duration`
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.limits.run_timeout_secs)
    }

    /// Total wall-clock budget as a `Duration`
    pub fn total_budget(&self) -> Duration {
        Duration::from_secs(self.limits.total_budget_secs)
    }
}

//! Default configuration values shared across the harness
//!
//! These constants are the single source of truth for configuration
//! defaults; the config file, CLI flags, and tests all reference them.

/// Default warm-up duration in seconds before measurement begins
pub const DEFAULT_WARMUP_SECS: u64 = 10;

/// Default measurement window in seconds
pub const DEFAULT_MEASURE_SECS: u64 = 30;

/// Default load generator connection count
pub const DEFAULT_CONNECTIONS: u32 = 64;

/// Default HTTP pipelining factor
pub const DEFAULT_PIPELINING: u32 = 1;

/// Default per-run timeout in seconds
pub const DEFAULT_RUN_TIMEOUT_SECS: u64 = 180;

/// Default grace period in milliseconds before escalating to SIGKILL
pub const DEFAULT_GRACE_MILLIS: u64 = 2_000;

/// Default number of retries for startup-class failures
pub const DEFAULT_RETRIES: u32 = 1;

/// Default total wall-clock budget in seconds for the whole comparison
pub const DEFAULT_TOTAL_BUDGET_SECS: u64 = 900;

/// Default throughput improvement threshold in percent
pub const DEFAULT_IMPROVE_THRESHOLD_PCT: f64 = 10.0;

/// Default throughput regression threshold in percent (negative)
pub const DEFAULT_REGRESS_THRESHOLD_PCT: f64 = -10.0;

/// Default tolerated p95 latency worsening in percent
pub const DEFAULT_LATENCY_GUARD_PCT: f64 = 5.0;

/// Default number of bootstrap iterations for the significance test
pub const DEFAULT_BOOTSTRAP_ITERATIONS: usize = 2_000;

// Serde default functions for struct field defaults

/// Returns the default warm-up duration
pub fn default_warmup_secs() -> u64 {
    DEFAULT_WARMUP_SECS
}

/// Returns the default measurement window
pub fn default_measure_secs() -> u64 {
    DEFAULT_MEASURE_SECS
}

/// Returns the default connection count
pub fn default_connections() -> u32 {
    DEFAULT_CONNECTIONS
}

/// Returns the default pipelining factor
pub fn default_pipelining() -> u32 {
    DEFAULT_PIPELINING
}

/// Returns the default per-run timeout
pub fn default_run_timeout_secs() -> u64 {
    DEFAULT_RUN_TIMEOUT_SECS
}

/// Returns the default grace period
pub fn default_grace_millis() -> u64 {
    DEFAULT_GRACE_MILLIS
}

/// Returns the default retry count
pub fn default_retries() -> u32 {
    DEFAULT_RETRIES
}

/// Returns the default total wall-clock budget
pub fn default_total_budget_secs() -> u64 {
    DEFAULT_TOTAL_BUDGET_SECS
}

/// Returns the default improvement threshold
pub fn default_improve_threshold_pct() -> f64 {
    DEFAULT_IMPROVE_THRESHOLD_PCT
}

/// Returns the default regression threshold
pub fn default_regress_threshold_pct() -> f64 {
    DEFAULT_REGRESS_THRESHOLD_PCT
}

/// Returns the default latency guard
pub fn default_latency_guard_pct() -> f64 {
    DEFAULT_LATENCY_GUARD_PCT
}

/// Returns the default bootstrap iteration count
pub fn default_bootstrap_iterations() -> usize {
    DEFAULT_BOOTSTRAP_ITERATIONS
}

//! Harness configuration and run-failure errors
//!
//! Typed errors for configuration validation and for the run-local
//! failure taxonomy the orchestrator converts into terminal run states.

use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// workload executable path is empty
    #[error("workload executable cannot be empty")]
    EmptyWorkloadExecutable,

    /// workload URL is empty
    #[error("workload url cannot be empty")]
    EmptyUrl,

    /// load generator executable path is empty
    #[error("load generator executable cannot be empty")]
    EmptyLoadExecutable,

    /// measurement window is zero
    #[error("measure_secs must be greater than 0")]
    InvalidMeasureWindow,

    /// connection count is zero
    #[error("connections must be at least 1")]
    InvalidConnections,

    /// pipelining factor is zero
    #[error("pipelining must be at least 1")]
    InvalidPipelining,

    /// per-run timeout is zero
    #[error("run_timeout_secs must be greater than 0")]
    InvalidRunTimeout,

    /// total budget shorter than a single run timeout
    #[error("total_budget_secs ({budget}) must be at least run_timeout_secs ({run_timeout})")]
    BudgetTooSmall { budget: u64, run_timeout: u64 },

    /// retry count beyond the supported bound
    #[error("retries ({retries}) must be at most {max}")]
    RetriesTooLarge { retries: u32, max: u32 },

    /// improvement threshold not positive
    #[error("improve_threshold_pct must be positive, got {0}")]
    InvalidImproveThreshold(f64),

    /// regression threshold not negative
    #[error("regress_threshold_pct must be negative, got {0}")]
    InvalidRegressThreshold(f64),

    /// Failed to parse JSON configuration
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Failed to read configuration file
    #[error("Failed to read config file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// Create an IO error with path context
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Run-local failures the orchestrator absorbs into terminal run states.
///
/// These never escalate past the orchestrator boundary; each maps to an
/// `ExitStatus` on the finalized `RunResult`.
#[derive(Debug, Error)]
pub enum RunError {
    /// The workload failed to start (bad path, port in use). Eligible
    /// for one retry.
    #[error("workload failed to start: {0}")]
    Startup(String),

    /// The workload exited with a non-zero status mid-run. Not retried.
    #[error("workload crashed with exit code {0}")]
    Crash(i32),

    /// The run exceeded its wall-clock budget
    #[error("run exceeded its time budget")]
    Timeout,

    /// The load generator itself failed. Treated like a crash.
    #[error("load generator failed: {0}")]
    LoadGenerator(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::EmptyWorkloadExecutable.to_string(),
            "workload executable cannot be empty"
        );
        assert_eq!(
            ConfigError::InvalidImproveThreshold(-3.0).to_string(),
            "improve_threshold_pct must be positive, got -3"
        );
        assert!(
            ConfigError::BudgetTooSmall {
                budget: 10,
                run_timeout: 60
            }
            .to_string()
            .contains("must be at least")
        );
    }

    #[test]
    fn test_run_error_display() {
        assert_eq!(
            RunError::Crash(1).to_string(),
            "workload crashed with exit code 1"
        );
        assert_eq!(RunError::Timeout.to_string(), "run exceeded its time budget");
    }

    #[test]
    fn test_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = ConfigError::io("/path/to/config.json", io_err);
        assert!(err.to_string().contains("/path/to/config.json"));
    }
}

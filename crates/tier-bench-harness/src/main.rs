//! tier-bench: compare two workload variants under an instrumented runtime
//!
//! Spawns each variant, captures the tiered compiler's diagnostic
//! stream, drives a load generator against the workload's HTTP
//! endpoint, and prints a correlated comparison report.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tier_bench_harness::config::{HarnessConfig, LimitsConfig, LoadConfig, Thresholds, WorkloadConfig};
use tier_bench_harness::orchestrator::run_comparison;
use tier_bench_harness::render::{render, render_json, ReportFormat};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "tier-bench")]
#[command(about = "Benchmark comparison harness for tiered-compiler workloads")]
#[command(version)]
struct Args {
    /// JSON config file; CLI flags below override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to the instrumented workload executable
    #[arg(long, env = "TIER_BENCH_WORKLOAD")]
    workload: Option<String>,

    /// URL of the workload's HTTP endpoint
    #[arg(long)]
    url: Option<String>,

    /// Path to the load generator executable
    #[arg(long, env = "TIER_BENCH_LOADGEN")]
    loadgen: Option<String>,

    /// Measurement window in seconds
    #[arg(long)]
    duration: Option<u64>,

    /// Warm-up duration in seconds (0 skips warm-up)
    #[arg(long)]
    warmup: Option<u64>,

    /// Load generator connection count
    #[arg(long)]
    connections: Option<u32>,

    /// Output JSON file for the report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Report format printed to stdout
    #[arg(long, value_enum, default_value_t = ReportFormat::Console)]
    format: ReportFormat,
}

impl Args {
    /// Build the harness configuration from the optional file plus overrides
    fn build_config(&self) -> Result<HarnessConfig> {
        let mut config = match &self.config {
            Some(path) => HarnessConfig::load(path)
                .with_context(|| format!("loading config from {}", path.display()))?,
            None => {
                let workload = self
                    .workload
                    .clone()
                    .context("--workload is required without a config file")?;
                let url = self
                    .url
                    .clone()
                    .context("--url is required without a config file")?;
                let loadgen = self
                    .loadgen
                    .clone()
                    .context("--loadgen is required without a config file")?;
                HarnessConfig {
                    workload: WorkloadConfig {
                        executable: workload,
                        baseline_arg: "baseline".to_string(),
                        candidate_arg: "candidate".to_string(),
                        url,
                        env: Vec::new(),
                    },
                    load: LoadConfig {
                        executable: loadgen,
                        connections: tier_bench_common::defaults::DEFAULT_CONNECTIONS,
                        pipelining: tier_bench_common::defaults::DEFAULT_PIPELINING,
                        warmup_secs: tier_bench_common::defaults::DEFAULT_WARMUP_SECS,
                        measure_secs: tier_bench_common::defaults::DEFAULT_MEASURE_SECS,
                    },
                    limits: LimitsConfig::default(),
                    thresholds: Thresholds::default(),
                }
            }
        };

        if let Some(workload) = &self.workload {
            config.workload.executable = workload.clone();
        }
        if let Some(url) = &self.url {
            config.workload.url = url.clone();
        }
        if let Some(loadgen) = &self.loadgen {
            config.load.executable = loadgen.clone();
        }
        if let Some(duration) = self.duration {
            config.load.measure_secs = duration;
        }
        if let Some(warmup) = self.warmup {
            config.load.warmup_secs = warmup;
        }
        if let Some(connections) = self.connections {
            config.load.connections = connections;
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let config = args.build_config()?;
    info!(
        workload = %config.workload.executable,
        url = %config.workload.url,
        measure_secs = config.load.measure_secs,
        warmup_secs = config.load.warmup_secs,
        connections = config.load.connections,
        "starting comparison"
    );

    // Ctrl-C requests cooperative cancellation; the current variant is
    // stopped gracefully and the report still renders.
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            signal_cancel.cancel();
        }
    });

    let report = run_comparison(&config, &cancel).await;

    if let Some(path) = &args.output {
        std::fs::write(path, render_json(&report)?)
            .with_context(|| format!("writing report to {}", path.display()))?;
        info!(
            path = %path.display(),
            written_at = %chrono::Utc::now().to_rfc3339(),
            "report written"
        );
    }

    println!("{}", render(&report, args.format)?);
    Ok(())
}

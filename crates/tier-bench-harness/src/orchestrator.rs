//! Benchmark orchestrator
//!
//! Sequences the process runner and the load driver across the two
//! variants. Each variant walks the state machine
//! `Idle → Starting → WarmingUp → Measuring → Draining → Done`, with
//! `Failed` absorbing from any non-terminal state. Variants run
//! strictly sequentially so the workload's port and the host's
//! resources are never contended; the baseline is fully stopped before
//! the candidate starts.
//!
//! Failure policy: startup-class failures (spawn error, a crash or
//! load-tool error during warm-up) are retried once; a crash observed
//! after measuring has begun is not, since partial metrics from a
//! broken window must not be silently retried into the report.
//! Exhausting the total wall-clock budget abandons remaining work and
//! yields an Inconclusive report.

use crate::config::HarnessConfig;
use crate::error::RunError;
use crate::loadgen::{LoadDriver, LoadRequest};
use crate::parser::{parse_line, ParserState};
use crate::runner::{SourcedLine, WorkloadHandle};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tier_bench_common::{ComparisonReport, ExitStatus, RunResult, TraceEvent, Variant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Extra time allowed for the line collector to flush after the
/// workload process has exited
const COLLECTOR_FLUSH: Duration = Duration::from_secs(5);

/// Connections used for the low-rate warm-up window
const WARMUP_CONNECTIONS: u32 = 1;

/// Per-variant lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum RunPhase {
    #[default]
    Idle,
    Starting,
    WarmingUp,
    Measuring,
    Draining,
    Done,
    Failed,
}

impl RunPhase {
    /// Whether the state machine permits moving to `next`
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::*;
        match (self, next) {
            (Idle, Starting)
            | (Starting, WarmingUp)
            | (WarmingUp, Measuring)
            | (Measuring, Draining)
            | (Draining, Done) => true,
            // Failed absorbs from any non-terminal state
            (Idle | Starting | WarmingUp | Measuring | Draining, Failed) => true,
            _ => false,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Failed)
    }
}

/// Outcome of a single variant attempt
struct VariantOutcome {
    result: RunResult,
    /// Startup-class failures are eligible for a retry
    retryable: bool,
    notes: Vec<String>,
}

/// Run the full two-variant comparison.
///
/// Never fails: every run-local error is absorbed into a terminal
/// `RunResult`, and the correlation engine always produces a report.
pub async fn run_comparison(config: &HarnessConfig, cancel: &CancellationToken) -> ComparisonReport {
    let deadline = Instant::now() + config.total_budget();
    let mut notes = Vec::new();

    let baseline = run_variant(config, Variant::Baseline, deadline, cancel, &mut notes).await;

    let candidate = if Instant::now() >= deadline || cancel.is_cancelled() {
        warn!("budget exhausted before candidate run");
        notes.push("total wall-clock budget exhausted before the candidate run".to_string());
        RunResult::failed(Variant::Candidate, Vec::new(), ExitStatus::TimedOut, 0)
    } else {
        run_variant(config, Variant::Candidate, deadline, cancel, &mut notes).await
    };

    let mut report = crate::correlate::correlate(baseline, candidate, &config.thresholds);
    report.notes.extend(notes);
    info!(verdict = %report.verdict, "comparison complete");
    report
}

/// Run one variant, retrying startup-class failures within budget
async fn run_variant(
    config: &HarnessConfig,
    variant: Variant,
    deadline: Instant,
    cancel: &CancellationToken,
    notes: &mut Vec<String>,
) -> RunResult {
    // Saturate so an unvalidated retries value cannot wrap the counter
    let attempts = config.limits.retries.saturating_add(1);

    for attempt in 1..=attempts {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            notes.push(format!("{}: wall-clock budget exhausted", variant));
            return RunResult::failed(variant, Vec::new(), ExitStatus::TimedOut, 0);
        }

        let variant_deadline = Instant::now() + config.run_timeout().min(remaining);
        info!(variant = %variant, attempt, "starting variant run");

        let outcome = run_variant_once(config, variant, variant_deadline, cancel).await;
        notes.extend(outcome.notes);

        if outcome.retryable
            && attempt < attempts
            && Instant::now() < deadline
            && !cancel.is_cancelled()
        {
            warn!(variant = %variant, attempt, "startup-class failure, retrying");
            notes.push(format!("{}: attempt {} retried after startup failure", variant, attempt));
            continue;
        }
        return outcome.result;
    }

    unreachable!("retry loop always returns within `attempts` iterations")
}

/// Drive one variant attempt through the state machine
async fn run_variant_once(
    config: &HarnessConfig,
    variant: Variant,
    deadline: Instant,
    cancel: &CancellationToken,
) -> VariantOutcome {
    let mut phase = RunPhase::Idle;
    let driver = LoadDriver::new(&config.load.executable);

    // STARTING
    advance(&mut phase, RunPhase::Starting, variant);
    let variant_arg = match variant {
        Variant::Baseline => config.workload.baseline_arg.clone(),
        Variant::Candidate => config.workload.candidate_arg.clone(),
    };
    let mut handle = match WorkloadHandle::start(
        &config.workload.executable,
        &[variant_arg],
        &config.workload.env,
    ) {
        Ok(handle) => handle,
        Err(e) => {
            error!(variant = %variant, error = %e, "workload failed to start");
            advance(&mut phase, RunPhase::Failed, variant);
            return VariantOutcome {
                result: RunResult::failed(variant, Vec::new(), ExitStatus::FailedToStart, 0),
                retryable: true,
                notes: vec![format!("{}: {}", variant, e)],
            };
        }
    };

    // Events accumulate in a buffer shared with the collector task, so
    // they stay reachable even if the line channel never closes (a
    // leftover child of the workload can keep the pipes open past the
    // workload's own exit).
    let lines = handle
        .take_lines()
        .expect("line channel taken exactly once per handle");
    let collector = spawn_collector(lines);

    // WARMING UP
    advance(&mut phase, RunPhase::WarmingUp, variant);
    if config.load.warmup_secs > 0 {
        let warmup = LoadRequest {
            url: config.workload.url.clone(),
            connections: WARMUP_CONNECTIONS,
            duration: Duration::from_secs(config.load.warmup_secs),
            pipelining: 1,
        };
        match supervise(&mut handle, driver.run(&warmup), deadline, cancel).await {
            Ok(_) => {}
            Err(e) => {
                // A crash or tool failure before measurement began is
                // startup-class: retry once (port may have been busy,
                // the endpoint may not have been ready yet). A timeout
                // is not; it aborts the variant outright.
                warn!(variant = %variant, error = %e, "warm-up failed");
                advance(&mut phase, RunPhase::Failed, variant);
                let retryable = !matches!(e, RunError::Timeout);
                return fail_variant(variant, handle, collector, config.grace(), e, retryable).await;
            }
        }
    }

    // MEASURING
    advance(&mut phase, RunPhase::Measuring, variant);
    let measure = LoadRequest {
        url: config.workload.url.clone(),
        connections: config.load.connections,
        duration: Duration::from_secs(config.load.measure_secs),
        pipelining: config.load.pipelining,
    };
    let metrics = match supervise(&mut handle, driver.run(&measure), deadline, cancel).await {
        Ok(metrics) => metrics,
        Err(e) => {
            error!(variant = %variant, error = %e, "measurement failed");
            advance(&mut phase, RunPhase::Failed, variant);
            // Partial metrics from a broken window are invalid; never retried.
            return fail_variant(variant, handle, collector, config.grace(), e, false).await;
        }
    };

    // DRAINING
    advance(&mut phase, RunPhase::Draining, variant);
    if let Err(e) = handle.stop(config.grace()).await {
        warn!(variant = %variant, error = %e, "error stopping workload");
    }
    let (events, skipped) = finish_collector(collector).await;

    // DONE
    advance(&mut phase, RunPhase::Done, variant);
    info!(
        variant = %variant,
        events = events.len(),
        skipped,
        requests_per_sec = metrics.requests_per_sec,
        "variant run complete"
    );
    VariantOutcome {
        result: RunResult::completed(variant, events, metrics, skipped),
        retryable: false,
        notes: Vec::new(),
    }
}

fn advance(phase: &mut RunPhase, next: RunPhase, variant: Variant) {
    debug_assert!(phase.can_transition_to(next), "{} -> {}", phase, next);
    info!(variant = %variant, from = %phase, to = %next, "phase transition");
    *phase = next;
}

/// Await a load window while watching for a workload crash, the
/// variant deadline, and cooperative cancellation.
async fn supervise<F>(
    handle: &mut WorkloadHandle,
    load: F,
    deadline: Instant,
    cancel: &CancellationToken,
) -> Result<tier_bench_common::Metrics, RunError>
where
    F: std::future::Future<Output = Result<tier_bench_common::Metrics, RunError>>,
{
    tokio::select! {
        metrics = load => metrics,
        status = handle.wait() => {
            let code = status.ok().and_then(|s| s.code()).unwrap_or(-1);
            Err(RunError::Crash(code))
        }
        _ = tokio::time::sleep_until(deadline) => Err(RunError::Timeout),
        _ = cancel.cancelled() => Err(RunError::Timeout),
    }
}

/// Convert a run-local failure into a terminal result, stopping the
/// workload and retaining every event parsed before the failure.
async fn fail_variant(
    variant: Variant,
    mut handle: WorkloadHandle,
    collector: LineCollector,
    grace: Duration,
    error: RunError,
    retryable: bool,
) -> VariantOutcome {
    if let Err(e) = handle.stop(grace).await {
        warn!(variant = %variant, error = %e, "error stopping workload after failure");
    }
    let (events, skipped) = finish_collector(collector).await;

    let exit = match &error {
        RunError::Crash(code) => ExitStatus::Crashed(*code),
        RunError::Timeout => ExitStatus::TimedOut,
        RunError::Startup(_) => ExitStatus::FailedToStart,
        RunError::LoadGenerator(_) => ExitStatus::Crashed(-1),
    };

    VariantOutcome {
        result: RunResult::failed(variant, events, exit, skipped),
        retryable,
        notes: vec![format!("{}: {}", variant, error)],
    }
}

/// Events and skip count accumulated so far, shared between the
/// collector task and the orchestrator
#[derive(Default)]
struct Collected {
    events: Vec<TraceEvent>,
    skipped: u64,
}

/// A running line-collector task plus the buffer it fills
struct LineCollector {
    collected: Arc<Mutex<Collected>>,
    task: JoinHandle<()>,
}

/// Parse lines into events as they arrive, off the orchestrator's
/// critical path. Every parsed event lands in the shared buffer
/// immediately, not at task exit, so a channel that never closes
/// cannot hold already-parsed events hostage.
fn spawn_collector(mut lines: mpsc::Receiver<SourcedLine>) -> LineCollector {
    let collected = Arc::new(Mutex::new(Collected::default()));
    let buffer = Arc::clone(&collected);
    let task = tokio::spawn(async move {
        let mut state = ParserState::new();
        while let Some(line) = lines.recv().await {
            let event = parse_line(&line.text, &mut state, line.timestamp_millis);
            let mut collected = buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(event) = event {
                collected.events.push(event);
            }
            collected.skipped = state.skipped();
        }
    });
    LineCollector { collected, task }
}

/// Collect the parsed events, bounding how long we wait for the final
/// flush. If the line channel is still open past the bound the task is
/// aborted and whatever was buffered up to that point is returned.
async fn finish_collector(mut collector: LineCollector) -> (Vec<TraceEvent>, u64) {
    match tokio::time::timeout(COLLECTOR_FLUSH, &mut collector.task).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "line collector task failed"),
        Err(_) => {
            warn!("line collector did not flush in time, aborting it");
            collector.task.abort();
        }
    }
    let mut collected = collector
        .collected
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    (std::mem::take(&mut collected.events), collected.skipped)
}

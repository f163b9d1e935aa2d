//! Correlation and aggregation engine
//!
//! Pure merge of two finished runs into a `ComparisonReport`: grouped
//! event counts, percentage deltas, and the verdict. Never fails —
//! incomplete or degenerate inputs produce an Inconclusive report with
//! an explanatory note instead of an error.

use crate::config::Thresholds;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;
use tier_bench_common::{ComparisonReport, Deltas, EventDiff, RunResult, RunSummary, Verdict};

/// Fixed RNG seed so repeated correlation of identical inputs is
/// bit-identical
const BOOTSTRAP_SEED: u64 = 0x7ea2_be4c_0d15_ea5e;

/// Confidence level for the bootstrap interval
const CONFIDENCE_LEVEL: f64 = 0.95;

/// Correlate a baseline run with a candidate run.
///
/// The verdict is Inconclusive whenever either run failed, the baseline
/// throughput is zero, or the throughput delta's confidence interval
/// spans zero (when per-interval samples are available on both sides).
pub fn correlate(
    baseline: RunResult,
    candidate: RunResult,
    thresholds: &Thresholds,
) -> ComparisonReport {
    let event_diff = diff_events(&baseline, &candidate);
    let mut notes = Vec::new();

    for run in [&baseline, &candidate] {
        if !run.exit.is_success() {
            notes.push(format!("{} run failed: {:?}", run.variant, run.exit));
        }
    }

    let both_usable = baseline.is_success() && candidate.is_success();

    let (deltas, verdict) = if !both_usable {
        (Deltas::default(), Verdict::Inconclusive)
    } else if baseline.metrics.requests_per_sec == 0.0 {
        notes.push("baseline throughput is zero; deltas are undefined".to_string());
        (Deltas::default(), Verdict::Inconclusive)
    } else {
        let deltas = compute_deltas(&baseline, &candidate);
        let verdict = classify(&baseline, &candidate, deltas, thresholds, &mut notes);
        (deltas, verdict)
    };

    ComparisonReport {
        baseline: RunSummary::from(&baseline),
        candidate: RunSummary::from(&candidate),
        deltas,
        event_diff,
        verdict,
        notes,
    }
}

/// Union of subjects across both runs; missing sides count zero
fn diff_events(baseline: &RunResult, candidate: &RunResult) -> BTreeMap<String, EventDiff> {
    let mut diff: BTreeMap<String, EventDiff> = BTreeMap::new();
    for (subject, count) in baseline.event_counts() {
        diff.entry(subject).or_default().baseline_count = count;
    }
    for (subject, count) in candidate.event_counts() {
        diff.entry(subject).or_default().candidate_count = count;
    }
    diff
}

fn compute_deltas(baseline: &RunResult, candidate: &RunResult) -> Deltas {
    let base_rps = baseline.metrics.requests_per_sec;
    let throughput_pct =
        Some((candidate.metrics.requests_per_sec - base_rps) / base_rps * 100.0);

    let base_p95 = baseline.metrics.latency.p95_ms;
    let latency_p95_pct = if base_p95 > 0.0 {
        Some((candidate.metrics.latency.p95_ms - base_p95) / base_p95 * 100.0)
    } else {
        None
    };

    Deltas {
        throughput_pct,
        latency_p95_pct,
    }
}

fn classify(
    baseline: &RunResult,
    candidate: &RunResult,
    deltas: Deltas,
    thresholds: &Thresholds,
    notes: &mut Vec<String>,
) -> Verdict {
    let Some(throughput_pct) = deltas.throughput_pct else {
        return Verdict::Inconclusive;
    };

    // Latency improvement is a decrease; its sign is inverted relative
    // to throughput. A missing delta (zero baseline p95) blocks nothing.
    let latency_pct = deltas.latency_p95_pct.unwrap_or(0.0);
    if deltas.latency_p95_pct.is_none() {
        notes.push("baseline p95 latency is zero; latency delta is undefined".to_string());
    }

    // Significance: with per-interval samples on both sides, a
    // confidence interval of the rate difference that spans zero makes
    // the comparison inconclusive regardless of thresholds.
    let base_samples = &baseline.metrics.throughput_samples;
    let cand_samples = &candidate.metrics.throughput_samples;
    if base_samples.len() >= 2 && cand_samples.len() >= 2 {
        let (ci_lower, ci_upper) =
            bootstrap_difference_ci(base_samples, cand_samples, thresholds.bootstrap_iterations);
        if ci_lower <= 0.0 && ci_upper >= 0.0 {
            notes.push(format!(
                "throughput difference is not significant (95% CI [{:.1}, {:.1}] spans zero)",
                ci_lower, ci_upper
            ));
            return Verdict::Inconclusive;
        }
    }

    if throughput_pct >= thresholds.improve_pct && latency_pct <= thresholds.latency_guard_pct {
        Verdict::Improved
    } else if throughput_pct <= thresholds.regress_pct
        && latency_pct >= -thresholds.latency_guard_pct
    {
        Verdict::Regressed
    } else {
        Verdict::Inconclusive
    }
}

/// Bootstrap the difference of mean rates (candidate - baseline),
/// returning the confidence interval bounds.
fn bootstrap_difference_ci(baseline: &[f64], candidate: &[f64], iterations: usize) -> (f64, f64) {
    let iterations = iterations.max(100);
    let mut rng = StdRng::seed_from_u64(BOOTSTRAP_SEED);

    let mut diffs: Vec<f64> = (0..iterations)
        .map(|_| {
            let base_mean: f64 = (0..baseline.len())
                .map(|_| baseline[rng.gen_range(0..baseline.len())])
                .sum::<f64>()
                / baseline.len() as f64;
            let cand_mean: f64 = (0..candidate.len())
                .map(|_| candidate[rng.gen_range(0..candidate.len())])
                .sum::<f64>()
                / candidate.len() as f64;
            cand_mean - base_mean
        })
        .collect();

    diffs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let alpha = 1.0 - CONFIDENCE_LEVEL;
    let lower_idx = (alpha / 2.0 * iterations as f64) as usize;
    let upper_idx = ((1.0 - alpha / 2.0) * iterations as f64) as usize;
    (
        diffs[lower_idx],
        diffs[upper_idx.min(diffs.len() - 1)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tier_bench_common::{
        ExitStatus, LatencySummary, Metrics, TraceEvent, TraceEventKind, Variant,
    };

    fn metrics(rps: f64, p95: f64, samples: Vec<f64>) -> Metrics {
        Metrics {
            requests_per_sec: rps,
            latency: LatencySummary {
                p50_ms: p95 / 4.0,
                p95_ms: p95,
                p99_ms: p95 * 1.5,
                max_ms: p95 * 3.0,
            },
            sample_count: 1000,
            duration_millis: 30_000,
            throughput_samples: samples,
            complete: true,
        }
    }

    fn run(variant: Variant, rps: f64, p95: f64, samples: Vec<f64>) -> RunResult {
        RunResult::completed(variant, Vec::new(), metrics(rps, p95, samples), 0)
    }

    fn deopt(subject: &str, sequence: u64) -> TraceEvent {
        TraceEvent::new(TraceEventKind::Deoptimize, subject, "wrong map", sequence, 0)
    }

    #[test]
    fn test_clear_improvement_without_samples() {
        // Scenario: baseline 5000 rps / 45ms p95, candidate 12000 rps / 18ms p95
        let report = correlate(
            run(Variant::Baseline, 5000.0, 45.0, vec![]),
            run(Variant::Candidate, 12000.0, 18.0, vec![]),
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Improved);
        let tp = report.deltas.throughput_pct.unwrap();
        assert!((tp - 140.0).abs() < 0.01);
        assert!(report.deltas.latency_p95_pct.unwrap() < 0.0);
    }

    #[test]
    fn test_clear_improvement_with_significant_samples() {
        let report = correlate(
            run(
                Variant::Baseline,
                5000.0,
                45.0,
                vec![4900.0, 5000.0, 5050.0, 5100.0],
            ),
            run(
                Variant::Candidate,
                12000.0,
                18.0,
                vec![11800.0, 12000.0, 12100.0, 12200.0],
            ),
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Improved);
    }

    #[test]
    fn test_overlapping_samples_are_inconclusive() {
        // Delta exceeds the threshold but the CI of the difference spans zero
        let report = correlate(
            run(Variant::Baseline, 150.0, 10.0, vec![100.0, 200.0]),
            run(Variant::Candidate, 180.0, 10.0, vec![130.0, 230.0]),
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert!(report.notes.iter().any(|n| n.contains("spans zero")));
    }

    #[test]
    fn test_regression() {
        let report = correlate(
            run(Variant::Baseline, 10000.0, 20.0, vec![]),
            run(Variant::Candidate, 6000.0, 38.0, vec![]),
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Regressed);
        assert!(report.deltas.throughput_pct.unwrap() < -10.0);
    }

    #[test]
    fn test_improvement_blocked_by_latency_penalty() {
        // Throughput up 50% but p95 doubled: not an improvement
        let report = correlate(
            run(Variant::Baseline, 10000.0, 20.0, vec![]),
            run(Variant::Candidate, 15000.0, 40.0, vec![]),
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Inconclusive);
    }

    #[test]
    fn test_crashed_candidate_is_inconclusive_with_events_retained() {
        // Candidate exits 1 during measurement after 3 deopt events
        let candidate = RunResult::failed(
            Variant::Candidate,
            vec![deopt("foo:1", 0), deopt("foo:1", 1), deopt("bar:2", 2)],
            ExitStatus::Crashed(1),
            0,
        );
        let report = correlate(
            run(Variant::Baseline, 5000.0, 45.0, vec![]),
            candidate,
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert_eq!(report.candidate.event_total, 3);
        assert_eq!(report.candidate.exit, ExitStatus::Crashed(1));
        assert_eq!(report.deltas, Deltas::default());
        assert!(report.notes.iter().any(|n| n.contains("candidate")));
    }

    #[test]
    fn test_zero_baseline_rps_is_inconclusive() {
        let report = correlate(
            run(Variant::Baseline, 0.0, 45.0, vec![]),
            run(Variant::Candidate, 12000.0, 18.0, vec![]),
            &Thresholds::default(),
        );
        assert_eq!(report.verdict, Verdict::Inconclusive);
        assert_eq!(report.deltas.throughput_pct, None);
    }

    #[test]
    fn test_event_diff_unions_subjects() {
        // foo: 5 baseline / 0 candidate; bar: 0 baseline / 2 candidate
        let baseline = RunResult::completed(
            Variant::Baseline,
            (0..5).map(|i| deopt("foo", i)).collect(),
            metrics(5000.0, 45.0, vec![]),
            0,
        );
        let candidate = RunResult::completed(
            Variant::Candidate,
            vec![deopt("bar", 0), deopt("bar", 1)],
            metrics(5000.0, 45.0, vec![]),
            0,
        );
        let report = correlate(baseline, candidate, &Thresholds::default());
        assert_eq!(
            report.event_diff["foo"],
            EventDiff {
                baseline_count: 5,
                candidate_count: 0
            }
        );
        assert_eq!(
            report.event_diff["bar"],
            EventDiff {
                baseline_count: 0,
                candidate_count: 2
            }
        );
    }

    #[test]
    fn test_correlate_is_idempotent() {
        let make = || {
            (
                run(Variant::Baseline, 150.0, 10.0, vec![100.0, 200.0, 150.0]),
                run(Variant::Candidate, 180.0, 9.0, vec![130.0, 230.0, 170.0]),
            )
        };
        let (b1, c1) = make();
        let (b2, c2) = make();
        let first = correlate(b1, c1, &Thresholds::default());
        let second = correlate(b2, c2, &Thresholds::default());
        assert_eq!(first, second);
    }
}

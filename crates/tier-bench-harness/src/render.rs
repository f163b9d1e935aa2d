//! Report rendering
//!
//! The JSON form of `ComparisonReport` is the canonical interchange
//! shape; the console and markdown renderings are lossless projections
//! of it.

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use tier_bench_common::{ComparisonReport, RateStats, RunSummary};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Console,
    Json,
    Markdown,
}

/// Render the report in the requested format
pub fn render(report: &ComparisonReport, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Console => Ok(render_console(report)),
        ReportFormat::Json => render_json(report),
        ReportFormat::Markdown => Ok(render_markdown(report)),
    }
}

/// Canonical JSON projection
pub fn render_json(report: &ComparisonReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn fmt_delta(delta: Option<f64>) -> String {
    match delta {
        Some(pct) => format!("{:+.1}%", pct),
        None => "n/a".to_string(),
    }
}

fn fmt_rates(stats: RateStats) -> String {
    if stats.is_empty() {
        "n/a".to_string()
    } else {
        format!("{:.0}/{:.0}/{:.0}", stats.min, stats.avg, stats.max)
    }
}

fn fmt_exit(summary: &RunSummary) -> String {
    match summary.exit {
        tier_bench_common::ExitStatus::Success => "success".to_string(),
        tier_bench_common::ExitStatus::Crashed(code) => format!("crashed ({})", code),
        tier_bench_common::ExitStatus::TimedOut => "timed out".to_string(),
        tier_bench_common::ExitStatus::FailedToStart => "failed to start".to_string(),
    }
}

/// Console rendering: summary table, event diff table, notes
pub fn render_console(report: &ComparisonReport) -> String {
    let mut out = String::new();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["", "baseline", "candidate", "delta"]);
    table.add_row(vec![
        Cell::new("exit"),
        Cell::new(fmt_exit(&report.baseline)),
        Cell::new(fmt_exit(&report.candidate)),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("requests/sec"),
        Cell::new(format!("{:.1}", report.baseline.metrics.requests_per_sec)),
        Cell::new(format!("{:.1}", report.candidate.metrics.requests_per_sec)),
        Cell::new(fmt_delta(report.deltas.throughput_pct)),
    ]);
    table.add_row(vec![
        Cell::new("latency p95 (ms)"),
        Cell::new(format!("{:.1}", report.baseline.metrics.latency.p95_ms)),
        Cell::new(format!("{:.1}", report.candidate.metrics.latency.p95_ms)),
        Cell::new(fmt_delta(report.deltas.latency_p95_pct)),
    ]);
    let base_rates = RateStats::from_samples(&report.baseline.metrics.throughput_samples);
    let cand_rates = RateStats::from_samples(&report.candidate.metrics.throughput_samples);
    if !base_rates.is_empty() || !cand_rates.is_empty() {
        table.add_row(vec![
            Cell::new("rate min/avg/max"),
            Cell::new(fmt_rates(base_rates)),
            Cell::new(fmt_rates(cand_rates)),
            Cell::new(""),
        ]);
    }
    table.add_row(vec![
        Cell::new("trace events"),
        Cell::new(report.baseline.event_total.to_string()),
        Cell::new(report.candidate.event_total.to_string()),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("skipped lines"),
        Cell::new(report.baseline.skipped_lines.to_string()),
        Cell::new(report.candidate.skipped_lines.to_string()),
        Cell::new(""),
    ]);
    out.push_str(&table.to_string());
    out.push('\n');

    if !report.event_diff.is_empty() {
        let mut events = Table::new();
        events
            .load_preset(UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(vec!["subject", "baseline", "candidate"]);
        for (subject, diff) in &report.event_diff {
            events.add_row(vec![
                Cell::new(subject),
                Cell::new(diff.baseline_count.to_string()),
                Cell::new(diff.candidate_count.to_string()),
            ]);
        }
        out.push_str(&events.to_string());
        out.push('\n');
    }

    out.push_str(&format!("verdict: {}\n", report.verdict));
    for note in &report.notes {
        out.push_str(&format!("note: {}\n", note));
    }
    out
}

/// Markdown rendering of the same content
pub fn render_markdown(report: &ComparisonReport) -> String {
    let mut out = String::new();
    out.push_str("# Comparison report\n\n");
    out.push_str(&format!("**Verdict: {}**\n\n", report.verdict));

    out.push_str("| | baseline | candidate | delta |\n|---|---|---|---|\n");
    out.push_str(&format!(
        "| exit | {} | {} | |\n",
        fmt_exit(&report.baseline),
        fmt_exit(&report.candidate)
    ));
    out.push_str(&format!(
        "| requests/sec | {:.1} | {:.1} | {} |\n",
        report.baseline.metrics.requests_per_sec,
        report.candidate.metrics.requests_per_sec,
        fmt_delta(report.deltas.throughput_pct)
    ));
    out.push_str(&format!(
        "| latency p95 (ms) | {:.1} | {:.1} | {} |\n",
        report.baseline.metrics.latency.p95_ms,
        report.candidate.metrics.latency.p95_ms,
        fmt_delta(report.deltas.latency_p95_pct)
    ));
    out.push_str(&format!(
        "| trace events | {} | {} | |\n",
        report.baseline.event_total, report.candidate.event_total
    ));

    if !report.event_diff.is_empty() {
        out.push_str("\n## Event counts by subject\n\n");
        out.push_str("| subject | baseline | candidate |\n|---|---|---|\n");
        for (subject, diff) in &report.event_diff {
            out.push_str(&format!(
                "| {} | {} | {} |\n",
                subject, diff.baseline_count, diff.candidate_count
            ));
        }
    }

    if !report.notes.is_empty() {
        out.push_str("\n## Notes\n\n");
        for note in &report.notes {
            out.push_str(&format!("- {}\n", note));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use tier_bench_common::{
        Deltas, EventDiff, ExitStatus, Metrics, RunResult, Variant, Verdict,
    };

    fn sample_report() -> ComparisonReport {
        let baseline = RunResult::completed(
            Variant::Baseline,
            Vec::new(),
            Metrics {
                requests_per_sec: 5000.0,
                complete: true,
                ..Metrics::incomplete()
            },
            3,
        );
        let candidate = RunResult::failed(
            Variant::Candidate,
            Vec::new(),
            ExitStatus::Crashed(1),
            0,
        );
        let mut event_diff = BTreeMap::new();
        event_diff.insert(
            "getItem:42".to_string(),
            EventDiff {
                baseline_count: 5,
                candidate_count: 0,
            },
        );
        ComparisonReport {
            baseline: (&baseline).into(),
            candidate: (&candidate).into(),
            deltas: Deltas::default(),
            event_diff,
            verdict: Verdict::Inconclusive,
            notes: vec!["candidate run failed: Crashed(1)".to_string()],
        }
    }

    #[test]
    fn test_json_round_trips() {
        let report = sample_report();
        let json = render_json(&report).unwrap();
        let parsed: ComparisonReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_console_contains_verdict_and_notes() {
        let text = render_console(&sample_report());
        assert!(text.contains("verdict: inconclusive"));
        assert!(text.contains("crashed (1)"));
        assert!(text.contains("getItem:42"));
        assert!(text.contains("note: candidate run failed"));
    }

    #[test]
    fn test_markdown_projection() {
        let md = render_markdown(&sample_report());
        assert!(md.contains("**Verdict: inconclusive**"));
        assert!(md.contains("| getItem:42 | 5 | 0 |"));
        assert!(md.contains("- candidate run failed"));
    }

    #[test]
    fn test_console_rate_stats_row_only_with_samples() {
        let mut report = sample_report();
        assert!(!render_console(&report).contains("rate min/avg/max"));

        report.baseline.metrics.throughput_samples = vec![4000.0, 5000.0, 6000.0];
        let text = render_console(&report);
        assert!(text.contains("rate min/avg/max"));
        assert!(text.contains("4000/5000/6000"));
    }

    #[test]
    fn test_render_dispatch() {
        let report = sample_report();
        assert!(render(&report, ReportFormat::Json).unwrap().starts_with('{'));
        assert!(render(&report, ReportFormat::Markdown)
            .unwrap()
            .starts_with("# "));
    }
}

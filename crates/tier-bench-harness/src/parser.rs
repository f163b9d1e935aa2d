//! Diagnostic line parser
//!
//! Converts single lines of the runtime's tiered-compiler diagnostic
//! stream into typed `TraceEvent`s. The parser holds no state of its
//! own; the caller threads a `ParserState` through successive calls, so
//! concurrent runs never share mutable state.
//!
//! Recognized grammars, in descending fixed-prefix length (the longest
//! fixed prefix wins when a line could match more than one):
//!
//! ```text
//! [completed optimizing <subject> - took <n> ms]
//! [deoptimizing (DEOPT <bailout>): <subject> reason=<reason>]
//! [marking <subject> for optimized recompilation, reason: <reason>]
//! [ic <subject> <old>-><new>]
//! ```
//!
//! `marking` registers the subject and its reason in the in-flight map
//! and emits no event; the matching `completed optimizing` line emits an
//! `Optimize` event carrying that reason. Everything else on the stream
//! is noise and is silently counted as skipped.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use tier_bench_common::{TraceEvent, TraceEventKind};

/// Which grammar a line matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    OptimizeComplete,
    Deoptimize,
    OptimizeBegin,
    IcTransition,
}

/// (rule, fixed prefix, pattern) — kept sorted by prefix length descending
const GRAMMARS: &[(Rule, &str, &str)] = &[
    (
        Rule::OptimizeComplete,
        "[completed optimizing ",
        r"^\[completed optimizing (?P<subject>\S+) - took (?P<took>[0-9.]+) ms\]\s*$",
    ),
    (
        Rule::Deoptimize,
        "[deoptimizing (DEOPT ",
        r"^\[deoptimizing \(DEOPT (?P<bailout>[a-z-]+)\): (?P<subject>\S+) reason=(?P<reason>[^\]]+)\]\s*$",
    ),
    (
        Rule::OptimizeBegin,
        "[marking ",
        r"^\[marking (?P<subject>\S+) for optimized recompilation, reason: (?P<reason>[^\]]+)\]\s*$",
    ),
    (
        Rule::IcTransition,
        "[ic ",
        r"^\[ic (?P<subject>\S+) (?P<from>\w+)->(?P<to>\w+)\]\s*$",
    ),
];

fn compiled() -> &'static Vec<(Rule, Regex)> {
    static COMPILED: OnceLock<Vec<(Rule, Regex)>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        GRAMMARS
            .iter()
            .map(|(rule, _, pattern)| (*rule, Regex::new(pattern).expect("grammar pattern")))
            .collect()
    })
}

/// Per-run parser state, owned by the caller
#[derive(Debug, Default)]
pub struct ParserState {
    /// Subjects marked for optimization whose completion has not yet
    /// been observed, mapped to the reason given at marking time
    in_flight: HashMap<String, String>,
    /// Next sequence index to assign
    next_sequence: u64,
    /// Lines that matched no grammar
    skipped: u64,
}

impl ParserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of lines that matched no known grammar
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Number of subjects currently marked but not yet optimized
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    fn next_sequence(&mut self) -> u64 {
        let seq = self.next_sequence;
        self.next_sequence += 1;
        seq
    }
}

/// Parse one diagnostic line, returning the event it encodes, if any.
///
/// `timestamp_millis` is the wall-clock time the line was observed;
/// passing it in keeps parsing deterministic for a given input. Never
/// panics on malformed input — unmatched lines increment the skip
/// counter and yield `None`.
pub fn parse_line(
    line: &str,
    state: &mut ParserState,
    timestamp_millis: i64,
) -> Option<TraceEvent> {
    for (rule, regex) in compiled() {
        let Some(captures) = regex.captures(line) else {
            continue;
        };
        let subject = captures.name("subject")?.as_str().to_string();

        return match rule {
            Rule::OptimizeBegin => {
                let reason = captures.name("reason")?.as_str().to_string();
                state.in_flight.insert(subject, reason);
                None
            }
            Rule::OptimizeComplete => {
                let reason = state.in_flight.remove(&subject).unwrap_or_default();
                Some(TraceEvent::new(
                    TraceEventKind::Optimize,
                    subject,
                    reason,
                    state.next_sequence(),
                    timestamp_millis,
                ))
            }
            Rule::Deoptimize => {
                let reason = captures.name("reason")?.as_str().to_string();
                state.in_flight.remove(&subject);
                Some(TraceEvent::new(
                    TraceEventKind::Deoptimize,
                    subject,
                    reason,
                    state.next_sequence(),
                    timestamp_millis,
                ))
            }
            Rule::IcTransition => {
                let from = captures.name("from")?.as_str();
                let to = captures.name("to")?.as_str();
                Some(TraceEvent::new(
                    TraceEventKind::InlineCacheTransition,
                    subject,
                    format!("{}->{}", from, to),
                    state.next_sequence(),
                    timestamp_millis,
                ))
            }
        };
    }

    state.skipped += 1;
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammars_sorted_by_prefix_length() {
        // Tie-break policy: the most specific (longest fixed-prefix)
        // grammar must be tried first.
        for pair in GRAMMARS.windows(2) {
            assert!(pair[0].1.len() >= pair[1].1.len());
        }
    }

    #[test]
    fn test_optimize_begin_emits_nothing_and_registers() {
        let mut state = ParserState::new();
        let event = parse_line(
            "[marking getItem:42 for optimized recompilation, reason: hot and stable]",
            &mut state,
            100,
        );
        assert!(event.is_none());
        assert_eq!(state.in_flight(), 1);
        assert_eq!(state.skipped(), 0);
    }

    #[test]
    fn test_optimize_complete_carries_reason_from_begin() {
        let mut state = ParserState::new();
        parse_line(
            "[marking getItem:42 for optimized recompilation, reason: hot and stable]",
            &mut state,
            100,
        );
        let event = parse_line(
            "[completed optimizing getItem:42 - took 1.25 ms]",
            &mut state,
            105,
        )
        .unwrap();
        assert_eq!(event.kind, TraceEventKind::Optimize);
        assert_eq!(event.subject, "getItem:42");
        assert_eq!(event.reason, "hot and stable");
        assert_eq!(event.sequence, 0);
        assert_eq!(event.timestamp_millis, 105);
        assert_eq!(state.in_flight(), 0);
    }

    #[test]
    fn test_optimize_complete_without_begin_has_empty_reason() {
        let mut state = ParserState::new();
        let event = parse_line(
            "[completed optimizing handler:7 - took 0.4 ms]",
            &mut state,
            0,
        )
        .unwrap();
        assert_eq!(event.reason, "");
    }

    #[test]
    fn test_deoptimize() {
        let mut state = ParserState::new();
        let event = parse_line(
            "[deoptimizing (DEOPT eager): getItem:42 reason=wrong map]",
            &mut state,
            200,
        )
        .unwrap();
        assert_eq!(event.kind, TraceEventKind::Deoptimize);
        assert_eq!(event.subject, "getItem:42");
        assert_eq!(event.reason, "wrong map");
    }

    #[test]
    fn test_deoptimize_clears_in_flight_subject() {
        let mut state = ParserState::new();
        parse_line(
            "[marking getItem:42 for optimized recompilation, reason: hot and stable]",
            &mut state,
            0,
        );
        parse_line(
            "[deoptimizing (DEOPT lazy): getItem:42 reason=insufficient type feedback]",
            &mut state,
            1,
        );
        assert_eq!(state.in_flight(), 0);
    }

    #[test]
    fn test_ic_transition() {
        let mut state = ParserState::new();
        let event = parse_line("[ic getItem:42 monomorphic->polymorphic]", &mut state, 0).unwrap();
        assert_eq!(event.kind, TraceEventKind::InlineCacheTransition);
        assert_eq!(event.reason, "monomorphic->polymorphic");
    }

    #[test]
    fn test_noise_is_skipped_not_an_error() {
        let mut state = ParserState::new();
        for line in [
            "",
            "server listening on :3000",
            "[marking truncated",
            "[deoptimizing (DEOPT eager): malformed",
            "random log output with [brackets]",
        ] {
            assert!(parse_line(line, &mut state, 0).is_none());
        }
        assert_eq!(state.skipped(), 5);
    }

    #[test]
    fn test_deopt_line_never_matches_optimize_grammar() {
        let mut state = ParserState::new();
        let event = parse_line(
            "[deoptimizing (DEOPT soft): foo:1 reason=not enough type info]",
            &mut state,
            0,
        )
        .unwrap();
        assert_eq!(event.kind, TraceEventKind::Deoptimize);
    }

    #[test]
    fn test_deterministic_with_same_prior_state() {
        let line = "[completed optimizing f:9 - took 2.0 ms]";
        let mut a = ParserState::new();
        let mut b = ParserState::new();
        assert_eq!(parse_line(line, &mut a, 5), parse_line(line, &mut b, 5));
    }

    #[test]
    fn test_sequences_strictly_increasing() {
        let mut state = ParserState::new();
        let lines = [
            "[completed optimizing a:1 - took 1.0 ms]",
            "noise line",
            "[ic b:2 uninitialized->monomorphic]",
            "[deoptimizing (DEOPT eager): a:1 reason=wrong map]",
        ];
        let events: Vec<_> = lines
            .iter()
            .filter_map(|l| parse_line(l, &mut state, 0))
            .collect();
        assert_eq!(events.len(), 3);
        for pair in events.windows(2) {
            assert!(pair[1].sequence > pair[0].sequence);
        }
    }
}

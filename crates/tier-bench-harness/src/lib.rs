//! tier-bench-harness - Process orchestration and diagnostic correlation
//!
//! Runs two variants of a workload under an instrumented managed
//! runtime, captures the tiered compiler's diagnostic events, drives a
//! load generator against each variant, and correlates both streams
//! into a comparison report.
//!
//! ## Modules
//!
//! - [`config`]: Harness configuration with explicit defaults
//! - [`correlate`]: Pure correlation of two runs into a report
//! - [`error`]: Configuration and run-failure taxonomies
//! - [`loadgen`]: External load-generator adapter
//! - [`orchestrator`]: Per-variant state machine and sequencing
//! - [`parser`]: Diagnostic line grammars
//! - [`render`]: Console/JSON/markdown report projections
//! - [`runner`]: Workload subprocess supervision

pub mod config;
pub mod correlate;
pub mod error;
pub mod loadgen;
pub mod orchestrator;
pub mod parser;
pub mod render;
pub mod runner;

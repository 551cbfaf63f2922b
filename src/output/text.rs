//! Human-readable text output

use crate::runner::RunOutcome;
use crate::stats::LatencySummary;
use std::fmt::Write as _;

/// Print run results to stdout
pub fn print_results(outcome: &RunOutcome) {
    print!("{}", format_results(outcome));
}

/// Render run results as text
pub fn format_results(outcome: &RunOutcome) -> String {
    let mut out = String::new();
    let unit = outcome.clock.unit();
    let summary = outcome.samples.summary();

    // Writing into a String cannot fail
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(out, "                 SUBMISSION LATENCY");
    let _ = writeln!(out, "═══════════════════════════════════════════════════════════");
    let _ = writeln!(
        out,
        "Rounds: {} of {} completed",
        outcome.rounds_completed, outcome.rounds_requested
    );
    let _ = writeln!(out, "Samples: {} ({}, clock={})", summary.count, unit, outcome.clock);
    let _ = writeln!(out, "Completions reaped: {}", outcome.waits);

    if outcome.completion_errors > 0 {
        let _ = writeln!(out, "Completion errors: {}", outcome.completion_errors);
    }
    if let Some(ref e) = outcome.submit_error {
        let _ = writeln!(out, "Stopped early: {}", e);
    }
    if let Some(ref e) = outcome.reap_error {
        let _ = writeln!(out, "Stopped early: {:#}", e);
    }

    if summary.count > 0 {
        let _ = writeln!(out);
        write_summary(&mut out, &summary, unit);
    }

    out
}

fn write_summary(out: &mut String, summary: &LatencySummary, unit: &str) {
    let _ = writeln!(out, "Latency ({}):", unit);
    let _ = writeln!(out, "  min:   {:>12}", summary.min);
    let _ = writeln!(out, "  mean:  {:>12.1}", summary.mean);
    let _ = writeln!(out, "  p50:   {:>12}", summary.p50);
    let _ = writeln!(out, "  p90:   {:>12}", summary.p90);
    let _ = writeln!(out, "  p99:   {:>12}", summary.p99);
    let _ = writeln!(out, "  p99.9: {:>12}", summary.p999);
    let _ = writeln!(out, "  max:   {:>12}", summary.max);
}

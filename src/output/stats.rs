//! Batch statistics reporting
//!
//! Formats the outcome of a batch for the terminal.

use crate::fetch::{BatchReport, BatchSummary};
use std::fmt::Write;

/// Percentage of URLs whose fetch succeeded
pub fn success_rate(summary: &BatchSummary) -> f64 {
    if summary.total_urls == 0 {
        return 0.0;
    }
    (summary.succeeded as f64 / summary.total_urls as f64) * 100.0
}

/// Formats a batch report as a human-readable block
pub fn format_summary<R>(report: &BatchReport<R>) -> String {
    let summary = &report.summary;
    let mut out = String::new();

    let _ = writeln!(out, "=== Harvest Summary ===\n");
    let _ = writeln!(out, "Overview:");
    let _ = writeln!(out, "  Total URLs: {}", summary.total_urls);
    let _ = writeln!(out, "  Succeeded: {}", summary.succeeded);
    let _ = writeln!(out, "  Failed: {}", summary.failed);
    let _ = writeln!(out, "  Records written: {}", summary.records());
    if summary.dropped > 0 {
        let _ = writeln!(out, "  Dropped by extractor: {}", summary.dropped);
    }
    let _ = writeln!(out, "  Elapsed: {:.1}s", report.elapsed.as_secs_f64());
    if report.deadline_exceeded {
        let _ = writeln!(out, "  Deadline exceeded: yes");
    }
    let _ = writeln!(out);

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        let _ = writeln!(out, "Failures ({}):", failures.len());
        for failure in failures {
            let reason = failure
                .failure
                .as_ref()
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            let _ = writeln!(out, "  - {}: {}", failure.url, reason);
        }
        let _ = writeln!(out);
    }

    let _ = writeln!(
        out,
        "Success Rate: {:.1}% ({} / {} URLs fetched)",
        success_rate(summary),
        summary.succeeded,
        summary.total_urls
    );

    out
}

/// Prints a batch report to stdout
pub fn print_summary<R>(report: &BatchReport<R>) {
    print!("{}", format_summary(report));
}

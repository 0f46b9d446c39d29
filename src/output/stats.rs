//! Run statistics
//!
//! A [`RunSummary`] is assembled by the coordinator once every page task has
//! been joined, and is logged or printed at the end of the run.

use crate::state::{PageOutcome, PageReport};
use chrono::{DateTime, Utc};

/// Summary of one search run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub term: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Page count detected on the first page (after capping)
    pub page_count: u32,
    /// Records gathered across all pages
    pub record_count: usize,
    /// One report per page task, ordered by page number
    pub reports: Vec<PageReport>,
}

impl RunSummary {
    pub fn new(
        term: impl Into<String>,
        started_at: DateTime<Utc>,
        page_count: u32,
        record_count: usize,
        mut reports: Vec<PageReport>,
    ) -> Self {
        reports.sort_by_key(|report| report.page);
        Self {
            term: term.into(),
            started_at,
            finished_at: Utc::now(),
            page_count,
            record_count,
            reports,
        }
    }

    pub fn pages_harvested(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.outcome.is_success())
            .count()
    }

    pub fn pages_failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.outcome.is_failure())
            .count()
    }

    pub fn pages_aborted(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.outcome == PageOutcome::Aborted)
            .count()
    }

    pub fn failed_reports(&self) -> impl Iterator<Item = &PageReport> {
        self.reports
            .iter()
            .filter(|report| report.outcome.is_failure())
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }

    /// Logs the summary through tracing
    pub fn log(&self) {
        tracing::info!(
            "Search '{}' finished: {} records from {}/{} pages ({} failed, {} aborted) in {}s",
            self.term,
            self.record_count,
            self.pages_harvested(),
            self.page_count,
            self.pages_failed(),
            self.pages_aborted(),
            self.duration_seconds()
        );
        for report in self.failed_reports() {
            tracing::warn!(
                "Page {} ({}) {}: {}",
                report.page,
                report.url,
                report.outcome,
                report.outcome.error().unwrap_or_default()
            );
        }
    }
}

/// Prints the summary to stdout in a formatted manner
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Search: {}", summary.term);
    println!("  Started:  {}", summary.started_at.to_rfc3339());
    println!("  Finished: {}", summary.finished_at.to_rfc3339());
    println!("  Duration: {}s", summary.duration_seconds());
    println!();

    println!("Pages:");
    println!("  Detected:  {}", summary.page_count);
    println!("  Harvested: {}", summary.pages_harvested());
    println!("  Failed:    {}", summary.pages_failed());
    if summary.pages_aborted() > 0 {
        println!("  Aborted:   {}", summary.pages_aborted());
    }
    println!();

    let failed: Vec<_> = summary.failed_reports().collect();
    if !failed.is_empty() {
        println!("Failed Pages:");
        for report in failed {
            println!(
                "  - page {} [{}] {}: {}",
                report.page,
                report.outcome,
                report.url,
                report.outcome.error().unwrap_or_default()
            );
        }
        println!();
    }

    println!("Records: {}", summary.record_count);
}

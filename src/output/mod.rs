//! End-of-run reporting
//!
//! After the pool has drained, every discovered URI has a settled record.
//! The report lists them in discovery order and closes with the smallest
//! and largest resource encountered. Rendering is writer-generic so tests
//! can capture the exact text.

mod stats;

pub use stats::{collect_statistics, log_statistics, CrawlStatistics};

use crate::crawler::UriRecord;
use std::io;

/// One reported URI with its settled record.
#[derive(Debug, Clone)]
pub struct ReportEntry {
    /// The raw attribute value the URI was discovered as.
    pub uri: String,
    pub record: UriRecord,
}

/// The full end-of-run report, in discovery order.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub entries: Vec<ReportEntry>,
}

impl CrawlReport {
    /// The smallest resource; first-seen wins a size tie.
    pub fn min_size(&self) -> Option<&ReportEntry> {
        let mut min: Option<&ReportEntry> = None;
        for entry in &self.entries {
            match min {
                Some(current) if current.record.size <= entry.record.size => {}
                _ => min = Some(entry),
            }
        }
        min
    }

    /// The largest resource; first-seen wins a size tie.
    pub fn max_size(&self) -> Option<&ReportEntry> {
        let mut max: Option<&ReportEntry> = None;
        for entry in &self.entries {
            match max {
                Some(current) if current.record.size >= entry.record.size => {}
                _ => max = Some(entry),
            }
        }
        max
    }

    /// Renders the report: one line per URI, then the extremes (omitted
    /// when there are no records at all).
    pub fn write_to(&self, out: &mut impl io::Write) -> io::Result<()> {
        for entry in &self.entries {
            writeln!(out, "URI \"{}\" stored in {}", entry.uri, entry.record)?;
        }

        if let Some(entry) = self.min_size() {
            writeln!(out, "Minimal size: {}", entry.record)?;
        }
        if let Some(entry) = self.max_size() {
            writeln!(out, "Maximal size: {}", entry.record)?;
        }

        Ok(())
    }

    /// Prints the report to stdout.
    pub fn print(&self) {
        let stdout = io::stdout();
        if let Err(e) = self.write_to(&mut stdout.lock()) {
            tracing::error!("failed to print report: {}", e);
        }
    }
}

//! Statistics over a finished crawl
//!
//! A compact numeric summary of the crawl report, logged at the end of a
//! run. The report itself stays the authoritative per-URI output; the
//! statistics exist for the operator reading the log.

use crate::output::CrawlReport;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Distinct URIs discovered and scheduled.
    pub resources: usize,

    /// Sub-downloads whose transfer completed.
    pub succeeded: usize,

    /// Sub-downloads that failed.
    pub failed: usize,

    /// Bytes observed across all sub-downloads, partial transfers
    /// included.
    pub total_bytes: u64,
}

/// Collects statistics from a finished report.
pub fn collect_statistics(report: &CrawlReport) -> CrawlStatistics {
    let mut stats = CrawlStatistics::default();

    for entry in &report.entries {
        stats.resources += 1;
        if entry.record.success {
            stats.succeeded += 1;
        } else {
            stats.failed += 1;
        }
        stats.total_bytes += entry.record.size;
    }

    stats
}

/// Logs the summary at info level.
pub fn log_statistics(stats: &CrawlStatistics) {
    tracing::info!(
        "{} resources: {} downloaded, {} failed, {} bytes total",
        stats.resources,
        stats.succeeded,
        stats.failed,
        stats.total_bytes
    );
}

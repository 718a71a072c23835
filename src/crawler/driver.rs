//! Crawl driver: connects the segmenter to the job pool
//!
//! The [`HtmlCrawler`] is an [`Observer`] (the seed download feeds it the
//! page bytes chunk by chunk) and the owner of the sub-download machinery:
//! the URI table, the record cells, and the job pool. The moment the
//! segmenter completes a URI-bearing attribute value, the crawler inserts
//! a record and enqueues the download, while the rest of the seed page is
//! still arriving.
//!
//! Threading discipline: the URI table is written only by the thread
//! driving the seed download and read only after the pool has drained.
//! Each record cell is handed to exactly one job; the cell's mutex is the
//! exclusive-owner handle for that window, not a point of contention.

use super::fsm::{AttributeSink, Segmenter};
use crate::fetch::Downloader;
use crate::observer::{ChecksumObserver, Fanout, Observer, SizeObserver};
use crate::output::{CrawlReport, ReportEntry};
use crate::pool::JobPool;
use crate::uri::Uri;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Results of one sub-download, keyed by the raw attribute value that
/// named it.
///
/// Written by the one job that owns the record; read by the reporter
/// after the pool has drained. A failed download leaves `success` false
/// with whatever the observers saw before the failure (nothing, for a
/// connection that never opened).
#[derive(Debug, Clone, Default)]
pub struct UriRecord {
    /// Position-derived storage path, assigned before the download starts.
    pub filename: String,
    /// Adler-32 over the stored body.
    pub checksum: u32,
    /// Stored body size in bytes.
    pub size: u64,
    /// Whether the transfer completed.
    pub success: bool,
}

impl fmt::Display for UriRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} size: {}, Adler32 checksum: {:08x}",
            self.filename, self.size, self.checksum
        )
    }
}

type RecordCell = Arc<Mutex<UriRecord>>;

/// Streaming crawler over one seed page.
pub struct HtmlCrawler {
    /// Authority of the seed page, filled into host-less URIs.
    host_hint: String,
    port_hint: u16,
    output_dir: PathBuf,
    segmenter: Segmenter,
    pool: JobPool,
    /// URI string → index into `records`; the insert-if-absent gate.
    index: HashMap<String, usize>,
    /// Records in discovery order.
    records: Vec<(String, RecordCell)>,
}

impl HtmlCrawler {
    /// Creates a crawler for a seed identified by `seed`.
    ///
    /// Host-less URIs discovered in the page inherit the seed's host and
    /// port. `thread_limit` caps the download workers (`None` for
    /// unbounded). Resource files are stored under `output_dir`, which
    /// must already exist.
    pub fn new(seed: &Uri, thread_limit: Option<usize>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            host_hint: seed.host.clone(),
            port_hint: seed.port,
            output_dir: output_dir.into(),
            segmenter: Segmenter::new(),
            pool: JobPool::new(1, thread_limit),
            index: HashMap::new(),
            records: Vec::new(),
        }
    }

    /// Number of distinct URIs discovered so far.
    pub fn discovered(&self) -> usize {
        self.records.len()
    }

    /// Drains the pool, blocking until every enqueued sub-download has
    /// finished, and returns the accumulated records in discovery order.
    pub fn finish(self) -> CrawlReport {
        self.pool.shutdown();
        tracing::debug!(
            "crawl finished: {} bytes of seed page, {} URIs",
            self.segmenter.bytes_read(),
            self.records.len()
        );

        let entries = self
            .records
            .into_iter()
            .map(|(uri, cell)| {
                // After the drain barrier the job's clone is gone and the
                // cell unwraps; a cell the pool never accepted is read in
                // place.
                let record = match Arc::try_unwrap(cell) {
                    Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
                    Err(cell) => cell
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .clone(),
                };
                ReportEntry { uri, record }
            })
            .collect();

        CrawlReport { entries }
    }
}

impl Observer for HtmlCrawler {
    fn observe(&mut self, chunk: &[u8]) {
        // The segmenter steps out of self for the call so the crawler can
        // be the sink it emits into.
        let mut segmenter = std::mem::take(&mut self.segmenter);
        segmenter.advance(chunk, self);
        self.segmenter = segmenter;
    }
}

impl AttributeSink for HtmlCrawler {
    fn uri_attribute(
        &mut self,
        element: &str,
        attribute: &str,
        value: &str,
        line: u64,
        column: u64,
    ) {
        tracing::debug!(
            "element {} attribute {} URI \"{}\" at position {}:{}",
            element,
            attribute,
            value,
            line,
            column
        );

        // In-page anchors are not content.
        if value.starts_with('#') {
            return;
        }

        match self.index.entry(value.to_string()) {
            Entry::Occupied(_) => return,
            Entry::Vacant(vacant) => {
                vacant.insert(self.records.len());
            }
        }

        let cell = RecordCell::default();
        self.records.push((value.to_string(), Arc::clone(&cell)));

        let output_dir = self.output_dir.clone();
        let host_hint = self.host_hint.clone();
        let port_hint = self.port_hint;
        let uri_str = value.to_string();
        let accepted = self.pool.submit(move || {
            sub_download(&output_dir, &host_hint, port_hint, &uri_str, line, column, &cell);
        });
        if !accepted {
            tracing::warn!("job pool is shut down; sub-download dropped");
        }
    }
}

/// One sub-download job: fix up the URI, stream the body into the
/// position-derived file, and leave checksum, size and outcome in the
/// record.
fn sub_download(
    output_dir: &Path,
    host_hint: &str,
    port_hint: u16,
    uri_str: &str,
    line: u64,
    column: u64,
    cell: &RecordCell,
) {
    let target = output_dir.join(format!("{:08}_{:08}", line, column));

    let mut uri = Uri::parse(uri_str);
    if uri.host.is_empty() {
        uri.host = host_hint.to_string();
        uri.port = port_hint;
    }

    let mut record = cell.lock().unwrap_or_else(PoisonError::into_inner);
    record.filename = target.display().to_string();

    let UriRecord {
        checksum,
        size,
        success,
        ..
    } = &mut *record;

    let mut checksum_observer = ChecksumObserver::new(checksum);
    let mut size_observer = SizeObserver::new(size);
    let mut tee = Fanout::new();
    tee.push(&mut checksum_observer);
    tee.push(&mut size_observer);

    *success = Downloader::new(uri, target).run_with(&mut tee);
}

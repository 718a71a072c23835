//! fcrawl: streaming HTML resource crawler
//!
//! This crate downloads a seed HTML page, recognizes `href`/`src`
//! references while the page bytes are still arriving, and downloads every
//! referenced resource concurrently, computing a running Adler-32 checksum
//! and byte count for each.
//!
//! Three pieces carry the design:
//! - [`crawler::Segmenter`], a byte-driven state machine that survives
//!   arbitrary chunk fragmentation
//! - the [`observer`] pipeline, which lets one body stream feed a file,
//!   a checksum, a byte counter and the segmenter without re-buffering
//! - [`pool::JobPool`], an elastic worker set with a drain-and-shutdown
//!   barrier

pub mod crawler;
pub mod defer;
pub mod fetch;
pub mod observer;
pub mod output;
pub mod pool;
pub mod uri;

use thiserror::Error;

/// Main error type for fcrawl operations
#[derive(Debug, Error)]
pub enum FcrawlError {
    #[error("HTTP client error: {0}")]
    Client(#[from] reqwest::Error),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("cannot write {path}: {source}")]
    File { path: String, source: std::io::Error },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for fcrawl operations
pub type Result<T> = std::result::Result<T, FcrawlError>;

// Re-export commonly used types
pub use crawler::{HtmlCrawler, UriRecord};
pub use fetch::Downloader;
pub use observer::Observer;
pub use output::CrawlReport;
pub use pool::JobPool;
pub use uri::Uri;

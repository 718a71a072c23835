//! Blocking HTTP downloader
//!
//! A [`Downloader`] fetches one URI and streams the body to a local file,
//! optionally teeing every received chunk through an
//! [`Observer`](crate::observer::Observer) first. Workers run downloads as
//! plain blocking reads on their own OS threads, so instances hold no
//! shared state and any number of them can run in parallel.
//!
//! "Success" is transport-level: a completed transfer returns `true` even
//! for an HTTP error status; the error page is a body like any other and
//! is stored and measured the same way. Failures (unreachable host,
//! unwritable target, broken transfer) are logged to the error stream and
//! reported as `false`.

use crate::observer::Observer;
use crate::uri::Uri;
use crate::{FcrawlError, Result};
use reqwest::blocking::Client;
use reqwest::header::HOST;
use reqwest::redirect::Policy;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

/// Read granularity for the body stream.
const CHUNK_SIZE: usize = 16 * 1024;

/// Maximum redirect hops before the transfer is failed.
const MAX_REDIRECTS: usize = 10;

/// Builds the HTTP client for one download.
///
/// Redirects are followed automatically up to [`MAX_REDIRECTS`]. Only the
/// connection attempt is bounded in time; an accepted transfer runs to
/// completion however long the body takes.
fn build_client() -> Result<Client> {
    Ok(Client::builder()
        .user_agent(concat!("fcrawl/", env!("CARGO_PKG_VERSION")))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .connect_timeout(Duration::from_secs(10))
        .build()?)
}

/// Fetches one URI into one target file.
pub struct Downloader {
    uri: Uri,
    target: PathBuf,
}

impl Downloader {
    /// Creates a downloader for `uri` writing to `target`.
    pub fn new(uri: Uri, target: impl Into<PathBuf>) -> Self {
        Self {
            uri,
            target: target.into(),
        }
    }

    /// Runs the download, writing the body to the target file only.
    ///
    /// Returns `true` iff the transfer completed.
    pub fn run(&self) -> bool {
        self.execute(None)
    }

    /// Runs the download, feeding every received chunk to `observer`
    /// before appending it to the target file.
    ///
    /// Returns `true` iff the transfer completed.
    pub fn run_with(&self, observer: &mut dyn Observer) -> bool {
        self.execute(Some(observer))
    }

    fn execute(&self, observer: Option<&mut dyn Observer>) -> bool {
        match self.fetch(observer) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!(
                    "download of \"{}\" to {} failed: {}",
                    self.uri,
                    self.target.display(),
                    e
                );
                false
            }
        }
    }

    /// The transfer itself. The client session and the file handle are
    /// both released on every exit path.
    fn fetch(&self, mut observer: Option<&mut dyn Observer>) -> Result<()> {
        let client = build_client()?;

        let file = File::create(&self.target).map_err(|e| FcrawlError::File {
            path: self.target.display().to_string(),
            source: e,
        })?;
        let mut file = BufWriter::new(file);

        let url = self.uri.request_url();
        tracing::debug!("GET {}", url);

        // The Host header is set from the URI's host field even though the
        // URL names the host as well; agreeing values are harmless.
        let mut response = client
            .get(&url)
            .header(HOST, self.uri.host.as_str())
            .send()
            .map_err(|e| FcrawlError::Http {
                url: url.clone(),
                source: e,
            })?;

        let mut buffer = [0u8; CHUNK_SIZE];
        loop {
            let count = response.read(&mut buffer)?;
            if count == 0 {
                break;
            }
            if let Some(observer) = observer.as_deref_mut() {
                observer.observe(&buffer[..count]);
            }
            file.write_all(&buffer[..count]).map_err(|e| FcrawlError::File {
                path: self.target.display().to_string(),
                source: e,
            })?;
        }

        file.flush().map_err(|e| FcrawlError::File {
            path: self.target.display().to_string(),
            source: e,
        })?;

        tracing::debug!("stored {} as {}", url, self.target.display());
        Ok(())
    }
}

//! Online byte-stream observers
//!
//! An [`Observer`] consumes a byte stream chunk by chunk, without ever
//! seeing the whole body at once and without retaining any chunk beyond
//! the call. This is the seam that lets a single download feed a file
//! writer, a checksum, a byte counter and the HTML segmenter at the same
//! time with no re-buffering.
//!
//! Composition is a run-time list: [`Fanout`] forwards every chunk to each
//! of its inner observers in order. The indirect call per observer per
//! chunk is noise next to network I/O.

mod checksum;
mod size;

pub use checksum::ChecksumObserver;
pub use size::SizeObserver;

/// A consumer of successive chunks of a byte stream.
///
/// Implementations accumulate internal state across calls and publish
/// their final result when dropped. They must not hold on to `chunk`.
pub trait Observer {
    /// Feeds the next contiguous chunk of the stream.
    fn observe(&mut self, chunk: &[u8]);
}

/// Forwards each observed chunk to every inner observer, in push order.
#[derive(Default)]
pub struct Fanout<'a> {
    inner: Vec<&'a mut dyn Observer>,
}

impl<'a> Fanout<'a> {
    pub fn new() -> Self {
        Self { inner: Vec::new() }
    }

    /// Appends an observer; it will receive chunks after those already
    /// pushed.
    pub fn push(&mut self, observer: &'a mut dyn Observer) {
        self.inner.push(observer);
    }
}

impl Observer for Fanout<'_> {
    fn observe(&mut self, chunk: &[u8]) {
        for observer in self.inner.iter_mut() {
            observer.observe(chunk);
        }
    }
}

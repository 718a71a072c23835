//! Byte-count observer.

use super::Observer;

/// Counts every byte observed and publishes the total into a caller-owned
/// cell on drop.
pub struct SizeObserver<'a> {
    size: u64,
    result: &'a mut u64,
}

impl<'a> SizeObserver<'a> {
    /// Creates an observer that will write its final byte count to
    /// `result`.
    pub fn new(result: &'a mut u64) -> Self {
        Self { size: 0, result }
    }
}

impl Observer for SizeObserver<'_> {
    fn observe(&mut self, chunk: &[u8]) {
        self.size += chunk.len() as u64;
    }
}

impl Drop for SizeObserver<'_> {
    fn drop(&mut self) {
        *self.result = self.size;
    }
}

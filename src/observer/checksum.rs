//! Rolling Adler-32 checksum observer.

use super::Observer;
use adler32::RollingAdler32;

/// Maintains a running Adler-32 checksum over every byte observed and
/// publishes the final value into a caller-owned cell on drop.
///
/// Adler-32 is two 16-bit sums modulo 65521 combined as `(b << 16) | a`,
/// with `a` starting at 1; feeding the same bytes in any chunking yields
/// the same value.
pub struct ChecksumObserver<'a> {
    state: RollingAdler32,
    result: &'a mut u32,
}

impl<'a> ChecksumObserver<'a> {
    /// Creates an observer that will write its final checksum to `result`.
    pub fn new(result: &'a mut u32) -> Self {
        Self {
            state: RollingAdler32::new(),
            result,
        }
    }
}

impl Observer for ChecksumObserver<'_> {
    fn observe(&mut self, chunk: &[u8]) {
        self.state.update_buffer(chunk);
    }
}

impl Drop for ChecksumObserver<'_> {
    fn drop(&mut self) {
        *self.result = self.state.hash();
    }
}

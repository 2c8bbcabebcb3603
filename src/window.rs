//! Input window for the decoder: an owned buffer with explicit cursors.
//!
//! The window holds compressed bytes that have been read but not yet fed to
//! the decoder. `consumed` marks how far the decoder has advanced; `filled`
//! marks the end of valid data. When a new read completes, the unconsumed
//! tail is carried to offset 0 before the new bytes are appended after it,
//! so decode order is preserved across read boundaries.
//!
//! ```text
//!  before merge:  [ consumed ....... | carry .. ]             filled
//!  after merge:   [ carry .. | new bytes .............. ]     filled'
//!                 ^ consumed = 0
//! ```

use crate::Result;
use crate::codec::alloc_buffer;

/// Compressed input awaiting the decoder.
#[derive(Debug)]
pub struct InputWindow {
    buf: Vec<u8>,
    consumed: usize,
    filled: usize,
}

impl InputWindow {
    /// Creates an empty window with room for `capacity` bytes.
    ///
    /// The window grows if a merge ever needs more room; `capacity` only
    /// sizes the initial allocation.
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Ok(Self {
            buf: alloc_buffer(capacity)?,
            consumed: 0,
            filled: 0,
        })
    }

    /// Bytes not yet consumed by the decoder.
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.consumed..self.filled]
    }

    /// Number of bytes not yet consumed.
    pub fn pending_len(&self) -> usize {
        self.filled - self.consumed
    }

    /// Returns `true` once every filled byte has been consumed.
    pub fn is_drained(&self) -> bool {
        self.consumed == self.filled
    }

    #[cfg(test)]
    fn consumed(&self) -> usize {
        self.consumed
    }

    #[cfg(test)]
    fn filled(&self) -> usize {
        self.filled
    }

    /// Advances the consumption cursor.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds [`pending_len`](Self::pending_len); the decoder
    /// can never report consuming more than it was given.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.pending_len(), "consumed past end of window");
        self.consumed += n;
    }

    /// Carries the unconsumed tail to the front and appends `incoming` after it.
    ///
    /// Afterwards `consumed == 0` and `filled == carried + incoming.len()`.
    /// Returns the number of carried bytes.
    pub fn carry_and_append(&mut self, incoming: &[u8]) -> usize {
        let carried = self.pending_len();
        if self.consumed > 0 {
            self.buf.copy_within(self.consumed..self.filled, 0);
        }
        self.consumed = 0;
        self.filled = carried;

        let needed = carried + incoming.len();
        if needed > self.buf.len() {
            self.buf.resize(needed, 0);
        }
        self.buf[carried..needed].copy_from_slice(incoming);
        self.filled = needed;
        carried
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_window() {
        let window = InputWindow::with_capacity(8).unwrap();
        assert!(window.is_drained());
        assert_eq!(window.pending(), b"");
    }

    #[test]
    fn test_append_into_empty() {
        let mut window = InputWindow::with_capacity(8).unwrap();
        assert_eq!(window.carry_and_append(b"abcd"), 0);
        assert_eq!(window.pending(), b"abcd");
        assert_eq!(window.filled(), 4);
    }

    #[test]
    fn test_carry_preserves_order() {
        let mut window = InputWindow::with_capacity(8).unwrap();
        window.carry_and_append(b"abcdef");
        window.consume(4);
        assert_eq!(window.pending(), b"ef");

        let carried = window.carry_and_append(b"ghij");
        assert_eq!(carried, 2);
        assert_eq!(window.consumed(), 0);
        assert_eq!(window.filled(), 6);
        assert_eq!(window.pending(), b"efghij");
    }

    #[test]
    fn test_full_consume_then_merge() {
        let mut window = InputWindow::with_capacity(4).unwrap();
        window.carry_and_append(b"wxyz");
        window.consume(4);
        assert!(window.is_drained());
        assert_eq!(window.carry_and_append(b"12"), 0);
        assert_eq!(window.pending(), b"12");
    }

    #[test]
    fn test_grows_past_capacity() {
        let mut window = InputWindow::with_capacity(2).unwrap();
        window.carry_and_append(b"ab");
        window.consume(1);
        window.carry_and_append(b"cdefgh");
        assert_eq!(window.pending(), b"bcdefgh");
    }

    #[test]
    fn test_empty_append_keeps_carry() {
        let mut window = InputWindow::with_capacity(4).unwrap();
        window.carry_and_append(b"abc");
        window.consume(1);
        window.carry_and_append(b"");
        assert_eq!(window.pending(), b"bc");
    }

    #[test]
    #[should_panic(expected = "consumed past end of window")]
    fn test_over_consume_panics() {
        let mut window = InputWindow::with_capacity(4).unwrap();
        window.carry_and_append(b"ab");
        window.consume(3);
    }
}

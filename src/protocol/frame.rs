//! Incremental line framing over raw transport bytes.
//!
//! Works on bytes rather than decoded text: a Drift payload follows the
//! request line directly and must reach the upload sink untouched.

use bytes::{Bytes, BytesMut};

use crate::protocol::error::FrameError;

/// Default cap on a single request line, delimiter excluded.
pub const DEFAULT_MAX_LINE: usize = 4096;

const INITIAL_BUFFER_CAPACITY: usize = 1024;

/// Extracts newline-delimited lines from an append-only buffer.
///
/// Bytes that do not yet form a complete line stay buffered for the next
/// [`append`](LineReader::append). The scan cursor remembers how far the
/// buffer has already been searched, so a line trickling in byte by byte is
/// not rescanned from the start on every chunk.
#[derive(Debug)]
pub struct LineReader {
    buf: BytesMut,
    scanned: usize,
    max_line: usize,
}

impl LineReader {
    /// Create a reader that rejects lines longer than `max_line` bytes.
    pub fn new(max_line: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY.min(max_line.saturating_add(2))),
            scanned: 0,
            max_line,
        }
    }

    /// Append a transport chunk to the pending bytes.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Remove and return the first complete line, without its `\n` or `\r\n`.
    ///
    /// Returns `Ok(None)` when no delimiter has arrived yet.
    pub fn next_line(&mut self) -> Result<Option<Bytes>, FrameError> {
        let found = self.buf[self.scanned..].iter().position(|b| *b == b'\n');

        let Some(offset) = found else {
            self.scanned = self.buf.len();
            // One extra byte leaves room for a trailing `\r` awaiting its `\n`.
            if self.buf.len() > self.max_line.saturating_add(1) {
                return Err(FrameError::LineTooLong {
                    len: self.buf.len(),
                    max: self.max_line,
                });
            }
            return Ok(None);
        };

        let end = self.scanned + offset;
        self.scanned = 0;

        let mut line = self.buf.split_to(end + 1);
        line.truncate(end);
        if line.last() == Some(&b'\r') {
            line.truncate(end - 1);
        }

        if line.len() > self.max_line {
            return Err(FrameError::LineTooLong {
                len: line.len(),
                max: self.max_line,
            });
        }

        Ok(Some(line.freeze()))
    }

    /// Take every buffered byte, leaving the reader empty.
    ///
    /// Used when the connection switches from line mode to raw body mode.
    pub fn take_remaining(&mut self) -> BytesMut {
        self.scanned = 0;
        self.buf.split()
    }

    /// Number of bytes held but not yet returned.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for LineReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LINE)
    }
}

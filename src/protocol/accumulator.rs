//! Bytes received since the last recognized line boundary.

use crate::port::LINE_TERMINATOR;

/// Initial capacity; most AT lines are well under this.
const INITIAL_CAPACITY: usize = 64;

/// Growable buffer of bytes received since the last boundary.
#[derive(Debug, Clone)]
pub struct LineAccumulator {
    buf: Vec<u8>,
}

impl Default for LineAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

impl LineAccumulator {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn push(&mut self, byte: u8) {
        self.buf.push(byte);
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Whether the buffer ends with `\r\n`.
    pub fn is_line_complete(&self) -> bool {
        self.buf.ends_with(LINE_TERMINATOR)
    }

    pub fn starts_with(&self, prefix: &[u8]) -> bool {
        self.buf.starts_with(prefix)
    }

    /// Position of the last line that consists of exactly `marker` followed
    /// by `\r\n`, provided it is also the final line in the buffer.
    ///
    /// A marker embedded in a longer line (`BOOK\r\n` for `OK`) does not
    /// count; neither does one followed by more data.
    pub fn final_line_position(&self, marker: &[u8]) -> Option<usize> {
        let line_len = marker.len() + LINE_TERMINATOR.len();
        if self.buf.len() < line_len || !self.is_line_complete() {
            return None;
        }
        let start = self.buf.len() - line_len;
        if &self.buf[start..start + marker.len()] != marker {
            return None;
        }
        if start == 0 || self.buf[start - 1] == b'\n' {
            Some(start)
        } else {
            None
        }
    }

    /// The whole buffer as trimmed text.
    pub fn trimmed(&self) -> String {
        Self::trim_text(&self.buf)
    }

    /// Everything before `end`, as trimmed text.
    pub fn trimmed_prefix(&self, end: usize) -> String {
        Self::trim_text(&self.buf[..end.min(self.buf.len())])
    }

    fn trim_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).trim().to_string()
    }
}

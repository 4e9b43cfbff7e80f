//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. For large outputs (e.g., full BGP tables),
//! this is critical for performance.

use regex::bytes::Regex;
use vte::{Parser, Perform};

/// Buffer for accumulating output and efficiently searching for patterns.
///
/// Incoming bytes are run through a VT parser so colour codes and cursor
/// movement never reach the prompt matcher.
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Parser state persists across chunks; escape sequences can be split.
    parser: Parser,
}

/// Collects printable text and the whitespace control bytes we care about.
struct Printable<'a> {
    out: &'a mut Vec<u8>,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        if matches!(byte, b'\n' | b'\r' | b'\t') {
            self.out.push(byte);
        }
    }
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            parser: Parser::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        let mut printable = Printable {
            out: &mut self.buffer,
        };
        self.parser.advance(&mut printable, data);
    }

    /// Find a prompt sitting at the very end of the buffer.
    ///
    /// Returns the absolute offset where the prompt starts. Only trailing
    /// whitespace may follow the match, so a prompt-looking line in the
    /// middle of command output does not end the read early.
    pub fn find_trailing(&self, pattern: &Regex) -> Option<usize> {
        let tail_start = self.buffer.len().saturating_sub(self.search_depth);
        let tail = &self.buffer[tail_start..];
        let m = pattern.find_iter(tail).last()?;
        if tail[m.end()..].iter().all(u8::is_ascii_whitespace) {
            Some(tail_start + m.start())
        } else {
            None
        }
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl std::fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_slice(), b"Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m\r\n");
        assert_eq!(buffer.as_slice(), b"Green text\r\n");
    }

    #[test]
    fn test_escape_split_across_chunks() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"a\x1b[3");
        buffer.extend(b"2mb");
        assert_eq!(buffer.as_slice(), b"ab");
    }

    #[test]
    fn test_find_trailing_requires_end_of_buffer() {
        let pattern = Regex::new(r"(?m)^\w+#\s?$").unwrap();

        let mut buffer = PatternBuffer::new(200);
        buffer.extend(b"show run\r\nrouter#\r\nhostname router\r\n");
        assert_eq!(buffer.find_trailing(&pattern), None);

        buffer.extend(b"router#");
        let start = buffer.find_trailing(&pattern).unwrap();
        assert_eq!(&buffer.as_slice()[start..], b"router#");
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.is_empty());
    }
}

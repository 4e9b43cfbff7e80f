//! PTY channel abstraction for interactive sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};
use crate::transport::ShellStream;

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Default timeout for read operations.
    pub timeout: Duration,

    /// Search depth for pattern matching.
    pub search_depth: usize,

    /// Line terminator appended by [`PtyChannel::send_line`].
    pub line_ending: &'static str,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            line_ending: "\n",
        }
    }
}

/// High-level PTY channel for interactive device sessions.
///
/// Wraps a [`ShellStream`] and provides pattern-based read operations
/// with timeout handling.
pub struct PtyChannel<S> {
    stream: S,
    config: PtyConfig,
    buffer: PatternBuffer,
}

impl<S: ShellStream> PtyChannel<S> {
    /// Create a new PTY channel over an open stream.
    pub fn new(stream: S, config: PtyConfig) -> Self {
        Self {
            buffer: PatternBuffer::new(config.search_depth),
            stream,
            config,
        }
    }

    /// Get the default timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    #[cfg(test)]
    pub(crate) fn stream(&self) -> &S {
        &self.stream
    }

    /// Write a line followed by the configured line ending.
    pub async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("pty: send {:?}", line);
        self.write_line(line).await
    }

    /// Write a line without logging its content (passwords, secrets).
    pub async fn send_hidden(&mut self, line: &str) -> Result<()> {
        trace!("pty: send <hidden>");
        self.write_line(line).await
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut data = Vec::with_capacity(line.len() + 2);
        data.extend_from_slice(line.as_bytes());
        data.extend_from_slice(self.config.line_ending.as_bytes());
        self.stream.write_all(&data).await
    }

    /// Read until `pattern` matches at the end of the output.
    ///
    /// Returns everything read, including the matched prompt.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        let (_, data) = self.read_until_any(&[pattern], timeout).await?;
        Ok(data)
    }

    /// Read until any of `patterns` matches at the end of the output.
    ///
    /// Returns the index of the first pattern that matched along with the
    /// data read. Patterns are tried in order, so list the most specific first.
    pub async fn read_until_any(
        &mut self,
        patterns: &[&Regex],
        timeout: Duration,
    ) -> Result<(usize, Vec<u8>)> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            if let Some(index) = patterns
                .iter()
                .position(|p| self.buffer.find_trailing(p).is_some())
            {
                return Ok((index, self.buffer.take()));
            }

            let chunk = tokio::time::timeout_at(deadline, self.stream.read_chunk())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))??;
            trace!("pty: read {} bytes", chunk.len());
            self.buffer.extend(&chunk);
        }
    }

    /// Drop anything buffered so far.
    pub fn clear_buffer(&mut self) {
        self.buffer.clear();
    }

    /// Close the channel and the underlying stream.
    pub async fn close(self) -> Result<()> {
        self.stream.shutdown().await
    }
}

//! Channel layer for pattern matching and PTY operations.
//!
//! This module handles the interactive session management,
//! including pattern-based prompt detection and ANSI stripping.

mod buffer;
pub(crate) mod patterns;
pub(crate) mod pty;

pub use buffer::PatternBuffer;
pub use patterns::combine_patterns;
pub use pty::{PtyChannel, PtyConfig};

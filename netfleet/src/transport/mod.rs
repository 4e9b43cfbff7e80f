//! Transport layer: SSH (via russh) and Telnet byte streams.
//!
//! Both transports end up as a [`ShellStream`], an interactive byte pipe
//! the channel layer reads prompts from and writes command lines to.

pub mod config;
mod ssh;
mod telnet;

use std::future::Future;

pub use config::{AuthMethod, HostKeyVerification, SshConfig, TelnetConfig};
pub use ssh::{SshShell, SshTransport};
pub use telnet::TelnetTransport;

use crate::error::Result;

/// An open interactive shell: bytes in, bytes out.
pub trait ShellStream: Send {
    /// Write raw bytes to the remote shell.
    fn write_all(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next chunk of output.
    ///
    /// Returns `ChannelError::Closed` once the remote side has closed the stream.
    fn read_chunk(&mut self) -> impl Future<Output = Result<Vec<u8>>> + Send;

    /// Close the stream and the connection underneath it.
    fn shutdown(self) -> impl Future<Output = Result<()>> + Send
    where
        Self: Sized;
}

//! Drivers that carry one device session.
//!
//! Every variant follows the same contract: connect, authenticate,
//! optionally escalate, send commands one at a time, close. The set of
//! variants is closed and dispatched through [`AnyDriver`].

mod any;
mod privilege;
mod response;
mod session;
mod ssh;
mod telnet;

pub use any::{AnyDriver, DefaultDriverFactory, DriverFactory};
pub use response::Response;
pub use ssh::{ShellDriver, StructuredDriver};
pub use telnet::TelnetDriver;

use std::future::Future;

use serde::Serialize;

use crate::error::Result;

/// Privilege state of an open session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPrivilege {
    /// The level a login lands in.
    Normal,
    /// Escalated, or logged straight into a privileged level.
    Privileged,
}

/// One device session.
///
/// Steps must be called in order: `connect`, `authenticate`, then
/// `escalate` (when the platform needs it) and `send_command` any number
/// of times. `close` is safe to call in any state.
pub trait TransportDriver: Send {
    /// Open the network connection.
    fn connect(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Log in and wait for the first prompt.
    fn authenticate(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Raise privileges according to the platform's escalation policy.
    fn escalate(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Send a command and wait for the prompt.
    ///
    /// A command the device rejects is still `Ok`, with
    /// [`Response::failure_message`] set.
    fn send_command(&mut self, command: &str) -> impl Future<Output = Result<Response>> + Send;

    /// Close the session.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Current privilege state.
    fn privilege(&self) -> SessionPrivilege;
}

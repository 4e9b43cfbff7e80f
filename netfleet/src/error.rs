//! Error types for netfleet.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// Main error type for netfleet operations.
#[derive(Error, Debug)]
pub enum Error {
    /// SSH or Telnet transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Channel operation errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Failed to persist a host transcript
    #[error("Failed to write transcript {}: {source}", path.display())]
    Transcript {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Transport layer errors (connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Server presented a key that differs from known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Server is not in known_hosts and verification is strict
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Telnet peer sent a malformed option negotiation
    #[error("Telnet negotiation error: {0}")]
    Telnet(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Channel layer errors (pattern matching, PTY operations).
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Failed to open PTY channel
    #[error("Failed to open PTY channel")]
    PtyOpenFailed,

    /// Pattern matching timed out
    #[error("Pattern not found within {0:?}")]
    PatternTimeout(Duration),

    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Driver layer errors (session state, command execution, privilege escalation).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call connect() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// Session is connected but not yet authenticated
    #[error("Session not authenticated - call authenticate() first")]
    NotAuthenticated,

    /// Device rejected the login credentials on an interactive login
    #[error("Login rejected for user '{user}'")]
    LoginRejected { user: String },

    /// Command execution failed
    #[error("Command failed: {message}")]
    CommandFailed { message: String },

    /// Platform requires an escalation credential the host does not carry
    #[error("Escalation requires {what} but none was provided")]
    MissingEscalationCredential { what: &'static str },

    /// Failed to acquire target privilege level
    #[error("Failed to acquire privilege level '{target}'")]
    PrivilegeAcquisitionFailed { target: String },

    /// Unknown privilege level detected
    #[error("Unknown privilege level from prompt: '{prompt}'")]
    UnknownPrivilege { prompt: String },

    /// No path found between privilege levels
    #[error("No path from privilege '{from}' to '{to}'")]
    NoPrivilegePath { from: String, to: String },

    /// Device answered in a shape the structured driver cannot demarcate
    #[error("Unexpected response: {message}")]
    UnexpectedResponse { message: String },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },

    /// No platform registered under this name
    #[error("Unsupported platform: '{name}'")]
    UnknownPlatform { name: String },

    /// Platform already registered
    #[error("Platform already registered: '{name}'")]
    AlreadyRegistered { name: String },
}

/// Flat classification of failures as they are reported per host and per command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No platform profile for the host's platform tag.
    Unsupported,
    /// Network failure or timeout while opening the session.
    ConnectFailed,
    /// Credentials rejected.
    AuthFailed,
    /// Privilege escalation rejected or impossible.
    EscalationFailed,
    /// A single command failed; other commands still run.
    CommandFailed,
    /// Device output could not be demarcated.
    ProtocolError,
    /// Operation or run deadline expired.
    Timeout,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Unsupported => "unsupported",
            ErrorKind::ConnectFailed => "connect failed",
            ErrorKind::AuthFailed => "auth failed",
            ErrorKind::EscalationFailed => "escalation failed",
            ErrorKind::CommandFailed => "command failed",
            ErrorKind::ProtocolError => "protocol error",
            ErrorKind::Timeout => "timeout",
        };
        f.write_str(s)
    }
}

impl Error {
    /// Classify this error independently of the stage it occurred in.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Transport(TransportError::AuthenticationFailed { .. })
            | Error::Driver(DriverError::LoginRejected { .. }) => ErrorKind::AuthFailed,
            Error::Transport(TransportError::Timeout(_))
            | Error::Channel(ChannelError::PatternTimeout(_)) => ErrorKind::Timeout,
            Error::Transport(_) | Error::Channel(_) => ErrorKind::ConnectFailed,
            Error::Driver(DriverError::MissingEscalationCredential { .. })
            | Error::Driver(DriverError::PrivilegeAcquisitionFailed { .. })
            | Error::Driver(DriverError::NoPrivilegePath { .. }) => ErrorKind::EscalationFailed,
            Error::Driver(DriverError::UnexpectedResponse { .. })
            | Error::Driver(DriverError::UnknownPrivilege { .. }) => ErrorKind::ProtocolError,
            Error::Driver(_) | Error::Transcript { .. } => ErrorKind::CommandFailed,
            Error::Platform(PlatformError::UnknownPlatform { .. }) => ErrorKind::Unsupported,
            Error::Platform(_) => ErrorKind::ProtocolError,
        }
    }

    /// Whether the underlying session can no longer carry commands.
    pub fn is_session_lost(&self) -> bool {
        matches!(
            self,
            Error::Transport(TransportError::Disconnected)
                | Error::Transport(TransportError::Io(_))
                | Error::Transport(TransportError::Ssh(_))
                | Error::Channel(ChannelError::Closed)
                | Error::Driver(DriverError::NotConnected)
                | Error::Driver(DriverError::NotAuthenticated)
        )
    }
}

/// Result type alias using netfleet's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        let err: Error = TransportError::AuthenticationFailed {
            user: "admin".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::AuthFailed);

        let err: Error = ChannelError::PatternTimeout(Duration::from_secs(1)).into();
        assert_eq!(err.kind(), ErrorKind::Timeout);

        let err: Error = DriverError::MissingEscalationCredential {
            what: "an enable secret",
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::EscalationFailed);

        let err: Error = PlatformError::UnknownPlatform {
            name: "unknown_vendor".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[test]
    fn test_session_lost() {
        let err: Error = ChannelError::Closed.into();
        assert!(err.is_session_lost());

        let err: Error = ChannelError::PatternTimeout(Duration::from_secs(1)).into();
        assert!(!err.is_session_lost());
    }
}

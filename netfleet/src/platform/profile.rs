//! Resolved per-platform session profile.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use super::definition::PlatformDefinition;

/// How a session to the device is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Interactive PTY shell over SSH with prompt matching.
    ShellSsh,
    /// Interactive shell over a plaintext Telnet stream.
    ShellTelnet,
    /// SSH session driven through the platform's privilege graph.
    StructuredSsh,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::ShellSsh => write!(f, "ssh"),
            TransportKind::ShellTelnet => write!(f, "telnet"),
            TransportKind::StructuredSsh => write!(f, "structured-ssh"),
        }
    }
}

/// What the platform needs before privileged commands are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Escalation {
    /// Login already lands in a usable mode.
    None,
    /// `enable`, then the enable secret.
    SecretOnly,
    /// `enable`, then an enable username, then the secret.
    SecretPlusUsername,
    /// The platform's explicit escalation command sequence.
    SequenceCommand,
}

impl Escalation {
    /// Whether the pipeline runs an escalation step at all.
    pub fn is_required(self) -> bool {
        !matches!(self, Escalation::None)
    }
}

/// Result of a registry lookup: transport, escalation policy and the
/// prompt definition shared by every host on the platform.
#[derive(Debug, Clone)]
pub struct PlatformProfile {
    /// Canonical platform name (transport suffix stripped).
    pub name: String,

    /// Transport used for hosts resolved to this profile.
    pub transport: TransportKind,

    /// Escalation policy.
    pub escalation: Escalation,

    /// Prompt and command handling for the platform.
    pub definition: Arc<PlatformDefinition>,
}

impl PlatformProfile {
    /// Same profile carried over Telnet.
    pub fn over_telnet(&self) -> Self {
        Self {
            transport: TransportKind::ShellTelnet,
            ..self.clone()
        }
    }
}

//! Platform definitions for multi-vendor support.
//!
//! This module defines vendor-specific configurations including prompt
//! patterns, privilege levels, escalation policy and which transport a
//! vendor is driven over.

mod definition;
mod privilege_level;
mod profile;
mod registry;
pub mod vendors;

pub use definition::PlatformDefinition;
pub use privilege_level::PrivilegeLevel;
pub use profile::{Escalation, PlatformProfile, TransportKind};
pub use registry::{BUILTIN_PLATFORMS, PlatformEntry, PlatformRegistry, split_transport_suffix};

/// Trait for vendor-specific output handling.
pub trait VendorBehavior: Send + Sync {
    /// Normalize raw shell output: strip the command echo and the trailing
    /// prompt line.
    fn normalize_output(&self, raw: &str, command: &str) -> String {
        default_normalize(raw, command)
    }

    /// Vendor clean-up applied after normalization.
    fn post_process_output(&self, output: &str) -> String {
        output.to_string()
    }

    /// Detect a vendor-specific command failure beyond `failed_when_contains`.
    fn detect_failure(&self, _output: &str) -> Option<String> {
        None
    }
}

/// Default vendor behavior implementation.
pub struct DefaultBehavior;

impl VendorBehavior for DefaultBehavior {}

/// Strip the echoed command from the start of the output and the prompt
/// from its last line.
pub(crate) fn default_normalize(raw: &str, command: &str) -> String {
    let text = raw.replace("\r\n", "\n").replace('\r', "");

    let output = text
        .trim_start_matches('\n')
        .strip_prefix(command)
        .unwrap_or(&text)
        .trim_start_matches('\n');

    // A single remaining line is the prompt itself
    output
        .rfind('\n')
        .map(|pos| output[..pos].to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_normalize_strips_echo_and_prompt() {
        let raw = "show clock\r\n*10:15:03.123 UTC Mon Mar 1 2026\r\nrouter#";
        assert_eq!(
            default_normalize(raw, "show clock"),
            "*10:15:03.123 UTC Mon Mar 1 2026"
        );
    }

    #[test]
    fn test_default_normalize_multiline() {
        let raw = "show ip int br\nInterface  IP-Address\nGi0/0      10.0.0.1\nrouter#";
        assert_eq!(
            default_normalize(raw, "show ip int br"),
            "Interface  IP-Address\nGi0/0      10.0.0.1"
        );
    }

    #[test]
    fn test_default_normalize_empty_output() {
        assert_eq!(default_normalize("clear counters\r\nrouter#", "clear counters"), "");
    }
}

//! Linux platform definition.
//!
//! Standard Linux/Unix shells with `$` (user) and `#` (root) prompts.

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Linux platform definition.
pub fn platform() -> PlatformDefinition {
    let user = PrivilegeLevel::new("user", r"(?m)^[^\n]{0,127}[$]\s?$").unwrap();

    let root = PrivilegeLevel::new("root", r"(?m)^[^\n]{0,127}[#]\s?$")
        .unwrap()
        .with_parent("user")
        .with_escalate("sudo -i")
        .with_deescalate("exit")
        .with_auth(r"(?m)^\[sudo\] password for [^:]+:\s?$|[Pp]assword:\s?$")
        .unwrap();

    PlatformDefinition::new("linux")
        .with_privilege(user)
        .with_privilege(root)
        .with_default_privilege("user")
        .with_failure_pattern("command not found")
        .with_failure_pattern("No such file or directory")
        .with_failure_pattern("Permission denied")
        .with_on_open_command("export TERM=dumb")
}

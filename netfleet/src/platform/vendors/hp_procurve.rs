//! HP ProCurve / Aruba-OS switch platform definition.
//!
//! `enable` on these switches asks for a manager username before the
//! password.
//!
//! # Prompt Examples
//!
//! ```text
//! HP-2920-24G>                     # exec
//! HP-2920-24G#                     # privilege_exec
//! HP-2920-24G(config)#             # configuration
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the HP ProCurve platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", r"(?mi)^[\w.\-@()/: ]{1,63}>\s?$").unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", r"(?mi)^[\w.\-@()/: ]{1,63}#\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable")
        .with_auth(r"(?mi)^password:\s?$")
        .unwrap()
        .with_not_contains("(config");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^[\w.\-@()/: ]{1,63}\(config[\w.\-@/:+]{0,63}\)#\s?$",
    )
    .unwrap()
    .with_parent("privilege_exec")
    .with_escalate("configure terminal")
    .with_deescalate("end");

    PlatformDefinition::new("hp_procurve")
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_failure_pattern("Invalid input:")
        .with_failure_pattern("Ambiguous input:")
        .with_failure_pattern("Incomplete input:")
        .with_on_open_command("no page")
        .with_terminal_size(200, 24)
}

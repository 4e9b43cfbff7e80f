//! Cisco platform definitions (IOS, IOS-XE, ASA, NX-OS, IOS-XR).
//!
//! IOS, IOS-XE and ASA land in user EXEC after login and need `enable`
//! plus the enable secret. NX-OS and IOS-XR land directly in a privileged
//! prompt.
//!
//! # Prompt Examples
//!
//! ```text
//! router>                          # exec
//! router#                          # privilege_exec
//! router(config)#                  # configuration
//! router(config-if)#               # configuration sub-mode
//! RP/0/RP0/CPU0:xr-edge#           # IOS-XR privilege_exec
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

const EXEC_PROMPT: &str = r"(?mi)^[\w.\-@/:]{1,63}>\s?$";
const PRIVILEGE_EXEC_PROMPT: &str = r"(?mi)^[\w.\-@/:]{1,63}#\s?$";
const CONFIGURATION_PROMPT: &str = r"(?mi)^[\w.\-@/:]{1,63}\(conf[\w.\-@/:+]{0,63}\)#\s?$";
const ENABLE_PROMPT: &str = r"(?mi)^(?:enable\s)?password:\s?$";

/// exec → privilege_exec → configuration, with `enable` guarded by a secret.
fn enable_levels(definition: PlatformDefinition) -> PlatformDefinition {
    let exec = PrivilegeLevel::new("exec", EXEC_PROMPT).unwrap();

    let privilege_exec = PrivilegeLevel::new("privilege_exec", PRIVILEGE_EXEC_PROMPT)
        .unwrap()
        .with_parent("exec")
        .with_escalate("enable")
        .with_deescalate("disable")
        .with_auth(ENABLE_PROMPT)
        .unwrap();

    let configuration = PrivilegeLevel::new("configuration", CONFIGURATION_PROMPT)
        .unwrap()
        .with_parent("privilege_exec")
        .with_escalate("configure terminal")
        .with_deescalate("end");

    definition
        .with_privilege(exec)
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
        .with_password_prompt(ENABLE_PROMPT)
        .unwrap()
}

/// privilege_exec → configuration, for platforms that log straight into `#`.
fn privileged_levels(definition: PlatformDefinition) -> PlatformDefinition {
    let privilege_exec = PrivilegeLevel::new("privilege_exec", PRIVILEGE_EXEC_PROMPT).unwrap();

    let configuration = PrivilegeLevel::new("configuration", CONFIGURATION_PROMPT)
        .unwrap()
        .with_parent("privilege_exec")
        .with_escalate("configure terminal")
        .with_deescalate("end");

    definition
        .with_privilege(privilege_exec)
        .with_privilege(configuration)
        .with_default_privilege("privilege_exec")
}

/// Cisco IOS.
pub fn ios() -> PlatformDefinition {
    enable_levels(PlatformDefinition::new("cisco_ios"))
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
}

/// Cisco IOS-XE.
pub fn xe() -> PlatformDefinition {
    enable_levels(PlatformDefinition::new("cisco_xe"))
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Unknown command")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
}

/// Cisco ASA.
pub fn asa() -> PlatformDefinition {
    enable_levels(PlatformDefinition::new("cisco_asa"))
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("ERROR: % ")
        .with_on_open_command("terminal pager 0")
}

/// Cisco NX-OS.
pub fn nxos() -> PlatformDefinition {
    privileged_levels(PlatformDefinition::new("cisco_nxos"))
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid command")
        .with_failure_pattern("% Invalid parameter detected")
        .with_failure_pattern("syntax error while parsing")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 511")
}

/// Cisco IOS-XR.
pub fn xr() -> PlatformDefinition {
    privileged_levels(PlatformDefinition::new("cisco_xr"))
        .with_failure_pattern("% Ambiguous command")
        .with_failure_pattern("% Incomplete command")
        .with_failure_pattern("% Invalid input detected")
        .with_failure_pattern("% Failed to commit")
        .with_on_open_command("terminal length 0")
        .with_on_open_command("terminal width 512")
}

//! Nokia SR OS platform definition.
//!
//! Both CLI engines are described. MD-CLI uses a two-line prompt with the
//! context on the first line; Classic CLI uses a single line without `@`.
//! Whichever engine the login lands in is accepted as the working level.
//!
//! # Prompt Examples
//!
//! ```text
//! [/]                                  # MD-CLI exec (line 1)
//! A:admin@router#                      # MD-CLI exec (line 2)
//!
//! (ex)[/]                              # MD-CLI exclusive config (line 1)
//! A:admin@router#                      # MD-CLI config (line 2)
//!
//! A:router#                            # Classic exec
//! *A:router>config#                    # Classic config with unsaved changes
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Nokia SR OS platform definition.
pub fn platform() -> PlatformDefinition {
    // Config-mode markers keep configuration prompts out of exec
    let exec = PrivilegeLevel::new(
        "exec",
        r"(?mi)^\[.*\]\r?\n\*?[abcd]:[\w._-]+@[\w\s_.-]+#\s?$",
    )
    .unwrap()
    .with_not_contains("(ex)")
    .with_not_contains("(ro)")
    .with_not_contains("(gl)")
    .with_not_contains("(pr)");

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^!?\*?\((?:ex|ex:bof)\)\[.*\]\r?\n\*?[abcd]:[\w._-]+@[\w\s_.-]+#\s?$",
    )
    .unwrap()
    .with_parent("exec")
    .with_escalate("edit-config exclusive")
    .with_deescalate("quit-config");

    let classic_exec = PrivilegeLevel::new("classic_exec", r"(?mi)^\*?[abcd]:[\w\s_.-]+#\s?$")
        .unwrap()
        .with_not_contains("@")
        .with_not_contains(">config");

    let classic_configuration = PrivilegeLevel::new(
        "classic_configuration",
        r"(?mi)^\*?[abcd]:[\w\s_.-]+>config[\w>]*(#|\$)\s?$",
    )
    .unwrap()
    .with_parent("classic_exec")
    .with_escalate("configure")
    .with_deescalate("exit all")
    .with_not_contains("@");

    PlatformDefinition::new("nokia_sros")
        .with_privilege(exec)
        .with_privilege(configuration)
        .with_privilege(classic_exec)
        .with_privilege(classic_configuration)
        .with_default_privilege("exec")
        .with_on_open_command("environment more false")
        .with_on_open_command("//environment no more")
        .with_failure_pattern("MINOR:")
        .with_failure_pattern("MAJOR:")
        .with_failure_pattern("CRITICAL:")
        .with_failure_pattern("Error:")
        .with_failure_pattern("Bad Command:")
        .with_terminal_size(512, 24)
}

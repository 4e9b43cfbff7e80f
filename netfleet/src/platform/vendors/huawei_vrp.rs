//! Huawei VRP platform definition.
//!
//! VRP escalates with `super`, which raises the command level without
//! changing the prompt. Success is judged from the dialog output.
//!
//! # Prompt Examples
//!
//! ```text
//! <HUAWEI>                         # user_view
//! [HUAWEI]                         # system_view
//! [HUAWEI-GigabitEthernet0/0/1]    # system_view sub-mode
//! ```

use crate::platform::{PlatformDefinition, PrivilegeLevel};

/// Create the Huawei VRP platform definition.
pub fn platform() -> PlatformDefinition {
    let user_view = PrivilegeLevel::new("user_view", r"(?m)^<[\w.\-@/: ]{1,63}>\s?$").unwrap();

    let system_view = PrivilegeLevel::new("system_view", r"(?m)^\[~?\*?[\w.\-@/: ]{1,63}\]\s?$")
        .unwrap()
        .with_parent("user_view")
        .with_escalate("system-view")
        .with_deescalate("return");

    PlatformDefinition::new("huawei_vrp")
        .with_privilege(user_view)
        .with_privilege(system_view)
        .with_default_privilege("user_view")
        .with_escalate_command("super")
        .with_failure_pattern("Error: ")
        .with_failure_pattern("Unrecognized command")
        .with_failure_pattern("Incomplete command")
        .with_failure_pattern("Wrong parameter")
        .with_on_open_command("screen-length 0 temporary")
}

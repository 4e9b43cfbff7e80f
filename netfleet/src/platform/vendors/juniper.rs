//! Juniper JUNOS platform definition.
//!
//! Supports Juniper devices running JUNOS with the following privilege levels:
//! - `exec` - Operational mode with `>` prompt
//! - `configuration` - Configuration mode with `#` prompt
//! - `shell` - Unix shell mode with `%` prompt
//!
//! # Prompt Examples
//!
//! ```text
//! user@router>              # exec mode
//! {master:0}                # routing-engine indicator (separate line)
//! user@router>              # exec prompt on next line
//! {master:0}[edit]          # config with routing-engine indicator
//! user@router#              # config prompt on next line
//! user@router%              # shell mode
//! ```

use std::sync::Arc;

use crate::platform::{PlatformDefinition, PrivilegeLevel, VendorBehavior};

/// Create the Juniper JUNOS platform definition.
pub fn platform() -> PlatformDefinition {
    let exec = PrivilegeLevel::new(
        "exec",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\n)?[\w\-@()/:\.]{1,63}>\s?$",
    )
    .unwrap();

    let configuration = PrivilegeLevel::new(
        "configuration",
        r"(?mi)^(\{\w+(:(\w+)?\d)?\}\[edit\]\n)?[\w\-@()/:\.]{1,63}#\s?$",
    )
    .unwrap()
    .with_parent("exec")
    .with_escalate("configure")
    .with_deescalate("exit configuration-mode");

    let shell = PrivilegeLevel::new("shell", r"(?mi)^[\w\-@()/:\.]{0,63}%\s?$")
        .unwrap()
        .with_parent("exec")
        .with_escalate("start shell")
        .with_deescalate("exit");

    PlatformDefinition::new("juniper_junos")
        .with_privilege(exec)
        .with_privilege(configuration)
        .with_privilege(shell)
        .with_default_privilege("exec")
        .with_failure_pattern("unknown command")
        .with_failure_pattern("syntax error")
        .with_failure_pattern("error:")
        .with_failure_pattern("missing argument")
        .with_failure_pattern("is ambiguous")
        .with_on_open_command("set cli screen-length 0")
        .with_on_open_command("set cli screen-width 511")
        .with_behavior(Arc::new(JuniperBehavior))
}

/// Juniper JUNOS-specific behavior.
pub struct JuniperBehavior;

impl VendorBehavior for JuniperBehavior {
    fn post_process_output(&self, output: &str) -> String {
        // [edit] context lines and routing-engine banners are prompt residue
        output
            .lines()
            .filter(|line| {
                let line = line.trim();
                !line.starts_with("[edit") && !line.starts_with("{master") && !line.starts_with("{backup")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_juniper_platform() {
        let platform = platform();
        assert_eq!(platform.name, "juniper_junos");
        assert_eq!(platform.privilege_levels.len(), 3);
        assert!(platform.get_privilege("exec").unwrap().is_root());
    }

    #[test]
    fn test_exec_prompt_match() {
        let platform = platform();
        let exec = platform.get_privilege("exec").unwrap();

        assert!(exec.matches("user@router>"));
        assert!(exec.matches("admin@mx960> "));
        assert!(exec.matches("{master:0}\nuser@router> "));
        assert!(!exec.matches("user@router# "));
        assert!(!exec.matches("user@router% "));
    }

    #[test]
    fn test_configuration_prompt_match() {
        let platform = platform();
        let configuration = platform.get_privilege("configuration").unwrap();

        assert!(configuration.matches("user@router# "));
        assert!(configuration.matches("{master:0}[edit]\nuser@router# "));
        assert!(!configuration.matches("user@router> "));
    }

    #[test]
    fn test_post_process_output() {
        let behavior = JuniperBehavior;

        let output = "Hostname: router\nModel: mx960";
        assert_eq!(behavior.post_process_output(output), output);

        let output = "ge-0/0/0\n[edit]\nge-0/0/1";
        assert_eq!(behavior.post_process_output(output), "ge-0/0/0\nge-0/0/1");

        let output = "{master:0}\nge-0/0/0";
        assert_eq!(behavior.post_process_output(output), "ge-0/0/0");
    }

    #[test]
    fn test_failed_when_contains() {
        let platform = platform();
        assert_eq!(
            platform.detect_failure("syntax error, expecting <command>."),
            Some("syntax error")
        );
    }
}

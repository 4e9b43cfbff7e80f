//! Platform definition for vendor-specific prompt and session handling.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use regex::bytes::Regex;

use super::VendorBehavior;
use super::privilege_level::PrivilegeLevel;

/// Default prompt a device shows when asking for an enable secret.
pub const DEFAULT_PASSWORD_PROMPT: &str = r"(?mi)^.*(password|secret):\s?$";

/// Default prompt a device shows when asking for an enable username.
pub const DEFAULT_USERNAME_PROMPT: &str = r"(?mi)^.*(username|user name|login):\s?$";

/// Everything needed to drive one vendor's CLI.
#[derive(Clone)]
pub struct PlatformDefinition {
    /// Platform name (e.g., "cisco_ios", "juniper_junos").
    pub name: String,

    /// Privilege levels for this platform, root first.
    pub privilege_levels: IndexMap<String, PrivilegeLevel>,

    /// Level commands are run in; escalation targets this level.
    pub default_privilege: String,

    /// Commands sent to escalate when the platform uses an explicit
    /// sequence rather than a single `enable`.
    pub escalate_commands: Vec<String>,

    /// Prompt asking for the enable secret.
    pub password_prompt: Regex,

    /// Prompt asking for the enable username.
    pub username_prompt: Regex,

    /// Patterns that indicate command failure.
    pub failed_when_contains: Vec<String>,

    /// Commands to run when the session is established (paging off etc.).
    pub on_open_commands: Vec<String>,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Optional vendor-specific behavior.
    pub behavior: Option<Arc<dyn VendorBehavior>>,
}

impl PlatformDefinition {
    /// Create a new platform definition with minimal required fields.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            privilege_levels: IndexMap::new(),
            default_privilege: String::new(),
            escalate_commands: vec![],
            password_prompt: Regex::new(DEFAULT_PASSWORD_PROMPT)
                .expect("default password prompt is a valid regex"),
            username_prompt: Regex::new(DEFAULT_USERNAME_PROMPT)
                .expect("default username prompt is a valid regex"),
            failed_when_contains: vec![],
            on_open_commands: vec![],
            terminal_width: 511,
            terminal_height: 24,
            behavior: None,
        }
    }

    /// Add a privilege level.
    pub fn with_privilege(mut self, level: PrivilegeLevel) -> Self {
        self.privilege_levels.insert(level.name.clone(), level);
        self
    }

    /// Set the default privilege level.
    pub fn with_default_privilege(mut self, name: impl Into<String>) -> Self {
        self.default_privilege = name.into();
        self
    }

    /// Append a command to the escalation sequence.
    pub fn with_escalate_command(mut self, command: impl Into<String>) -> Self {
        self.escalate_commands.push(command.into());
        self
    }

    /// Override the enable-secret prompt.
    pub fn with_password_prompt(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.password_prompt = Regex::new(pattern)?;
        Ok(self)
    }

    /// Add a failure pattern.
    pub fn with_failure_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.failed_when_contains.push(pattern.into());
        self
    }

    /// Add an on_open command.
    pub fn with_on_open_command(mut self, command: impl Into<String>) -> Self {
        self.on_open_commands.push(command.into());
        self
    }

    /// Set terminal dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set vendor behavior.
    pub fn with_behavior(mut self, behavior: Arc<dyn VendorBehavior>) -> Self {
        self.behavior = Some(behavior);
        self
    }

    /// Get a privilege level by name.
    pub fn get_privilege(&self, name: &str) -> Option<&PrivilegeLevel> {
        self.privilege_levels.get(name)
    }

    /// First failure pattern found in `output`, if any.
    pub fn detect_failure(&self, output: &str) -> Option<&str> {
        self.failed_when_contains
            .iter()
            .find(|pattern| output.contains(pattern.as_str()))
            .map(String::as_str)
    }
}

impl fmt::Debug for PlatformDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlatformDefinition")
            .field("name", &self.name)
            .field("privilege_levels", &self.privilege_levels.keys())
            .field("default_privilege", &self.default_privilege)
            .field("escalate_commands", &self.escalate_commands)
            .field("failed_when_contains", &self.failed_when_contains)
            .field("on_open_commands", &self.on_open_commands)
            .field(
                "behavior",
                &self.behavior.as_ref().map(|_| "<VendorBehavior>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_failure() {
        let definition = PlatformDefinition::new("test")
            .with_failure_pattern("% Invalid input")
            .with_failure_pattern("% Incomplete command");

        assert_eq!(
            definition.detect_failure("   ^\n% Invalid input detected at '^' marker."),
            Some("% Invalid input")
        );
        assert_eq!(definition.detect_failure("Cisco IOS Software"), None);
    }

    #[test]
    fn test_default_escalation_prompts() {
        let definition = PlatformDefinition::new("test");
        assert!(definition.password_prompt.is_match(b"Password: "));
        assert!(definition.password_prompt.is_match(b"enable\r\nPassword:"));
        assert!(definition.username_prompt.is_match(b"Username: "));
        assert!(!definition.username_prompt.is_match(b"router#"));
    }
}

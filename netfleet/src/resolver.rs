//! Per-host command selection.

use indexmap::IndexMap;
use log::debug;
use serde::Deserialize;

use crate::inventory::Host;
use crate::platform::split_transport_suffix;

/// Commands keyed by group name or platform tag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct CommandCatalog {
    entries: IndexMap<String, Vec<String>>,
}

impl CommandCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the commands for a key.
    pub fn insert<I, S>(&mut self, key: impl Into<String>, commands: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entries
            .insert(key.into(), commands.into_iter().map(Into::into).collect());
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with<I, S>(mut self, key: impl Into<String>, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert(key, commands);
        self
    }

    /// Commands for a key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.entries.get(key).map(Vec::as_slice)
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog has no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Ordered commands for one host. Empty means a connectivity check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandSet(Vec<String>);

impl CommandSet {
    /// Commands in execution order.
    pub fn commands(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for CommandSet {
    fn from(commands: Vec<String>) -> Self {
        Self(commands)
    }
}

impl<'a> IntoIterator for &'a CommandSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Picks the command list for a host.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandResolver;

impl CommandResolver {
    /// Resolve commands for `host`.
    ///
    /// Precedence: the host's own commands, then the first of its groups
    /// present in the catalog, then its platform tag (as written, then
    /// without a transport suffix). Nothing matching yields an empty set.
    pub fn resolve(host: &Host, catalog: &CommandCatalog) -> CommandSet {
        if !host.commands.is_empty() {
            debug!("{}: using {} host commands", host.name, host.commands.len());
            return CommandSet(host.commands.clone());
        }

        if let Some((group, commands)) = host
            .groups
            .iter()
            .find_map(|group| catalog.get(group).map(|commands| (group, commands)))
        {
            debug!("{}: using commands of group '{}'", host.name, group);
            return CommandSet(commands.to_vec());
        }

        let tag = host.platform.trim();
        let (base, _) = split_transport_suffix(tag);
        if let Some(commands) = catalog.get(tag).or_else(|| catalog.get(base)) {
            debug!("{}: using commands of platform '{}'", host.name, tag);
            return CommandSet(commands.to_vec());
        }

        debug!("{}: no commands resolved", host.name);
        CommandSet::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Credentials;

    fn host(platform: &str) -> Host {
        Host::new("r1", "192.0.2.1", platform, Credentials::new("u", "p"))
    }

    fn catalog() -> CommandCatalog {
        CommandCatalog::new()
            .with("cisco", ["show version", "show ip interface brief"])
            .with("core", ["show ip bgp summary"])
            .with("cisco_ios", ["show clock"])
            .with("juniper_junos", ["show system uptime"])
    }

    #[test]
    fn test_host_commands_win() {
        let host = host("cisco_ios").with_group("cisco").with_command("show users");
        let set = CommandResolver::resolve(&host, &catalog());
        assert_eq!(set.commands(), ["show users"]);
    }

    #[test]
    fn test_first_matching_group() {
        let host = host("cisco_ios")
            .with_group("unknown")
            .with_group("core")
            .with_group("cisco");
        let set = CommandResolver::resolve(&host, &catalog());
        assert_eq!(set.commands(), ["show ip bgp summary"]);
    }

    #[test]
    fn test_platform_fallback_strips_suffix() {
        let set = CommandResolver::resolve(&host("cisco_ios"), &catalog());
        assert_eq!(set.commands(), ["show clock"]);

        let set = CommandResolver::resolve(&host("juniper_junos_telnet"), &catalog());
        assert_eq!(set.commands(), ["show system uptime"]);
    }

    #[test]
    fn test_nothing_matches() {
        let set = CommandResolver::resolve(&host("linux"), &catalog());
        assert!(set.is_empty());
    }

    #[test]
    fn test_catalog_deserializes_in_order() {
        let catalog: CommandCatalog = serde_json::from_str(
            r#"{"cisco": ["show version", "show ip interface brief"], "arista": ["show lldp neighbors"]}"#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get("cisco").unwrap(),
            ["show version", "show ip interface brief"]
        );
    }
}

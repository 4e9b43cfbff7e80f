//! Platform registry: platform tag → session profile.

use std::collections::HashMap;
use std::sync::Arc;

use log::debug;

use super::definition::PlatformDefinition;
use super::profile::{Escalation, PlatformProfile, TransportKind};
use super::vendors;
use crate::error::{PlatformError, Result};

/// One row of the platform table.
#[derive(Debug, Clone, Copy)]
pub struct PlatformEntry {
    /// Canonical platform tag.
    pub name: &'static str,
    /// Transport used over SSH-capable inventories.
    pub transport: TransportKind,
    /// Escalation policy.
    pub escalation: Escalation,
    /// Constructor for the prompt definition.
    pub definition: fn() -> PlatformDefinition,
}

/// Built-in platforms. Adding a vendor means adding a row here.
pub const BUILTIN_PLATFORMS: &[PlatformEntry] = &[
    PlatformEntry {
        name: "cisco_ios",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::SecretOnly,
        definition: vendors::cisco::ios,
    },
    PlatformEntry {
        name: "cisco_xe",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::SecretOnly,
        definition: vendors::cisco::xe,
    },
    PlatformEntry {
        name: "cisco_asa",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::SecretOnly,
        definition: vendors::cisco::asa,
    },
    PlatformEntry {
        name: "cisco_nxos",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::None,
        definition: vendors::cisco::nxos,
    },
    PlatformEntry {
        name: "cisco_xr",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::None,
        definition: vendors::cisco::xr,
    },
    PlatformEntry {
        name: "arista_eos",
        transport: TransportKind::StructuredSsh,
        escalation: Escalation::SecretOnly,
        definition: vendors::arista::platform,
    },
    PlatformEntry {
        name: "juniper_junos",
        transport: TransportKind::StructuredSsh,
        escalation: Escalation::None,
        definition: vendors::juniper::platform,
    },
    PlatformEntry {
        name: "nokia_sros",
        transport: TransportKind::StructuredSsh,
        escalation: Escalation::None,
        definition: vendors::nokia_sros::platform,
    },
    PlatformEntry {
        name: "hp_procurve",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::SecretPlusUsername,
        definition: vendors::hp_procurve::platform,
    },
    PlatformEntry {
        name: "huawei_vrp",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::SequenceCommand,
        definition: vendors::huawei_vrp::platform,
    },
    PlatformEntry {
        name: "linux",
        transport: TransportKind::ShellSsh,
        escalation: Escalation::None,
        definition: vendors::linux::platform,
    },
];

/// Short names accepted in inventories, mapped to canonical tags.
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("ios", "cisco_ios"),
    ("iosxe", "cisco_xe"),
    ("nxos", "cisco_nxos"),
    ("iosxr", "cisco_xr"),
    ("asa", "cisco_asa"),
    ("eos", "arista_eos"),
    ("junos", "juniper_junos"),
    ("sros", "nokia_sros"),
    ("procurve", "hp_procurve"),
    ("vrp", "huawei_vrp"),
    ("cisco", "cisco_ios"),
    ("arista", "arista_eos"),
    ("juniper", "juniper_junos"),
    ("nokia", "nokia_sros"),
    ("huawei", "huawei_vrp"),
    ("hp", "hp_procurve"),
];

/// Registry of platform profiles.
///
/// Built once at startup and shared read-only across every host task.
#[derive(Debug, Default)]
pub struct PlatformRegistry {
    profiles: HashMap<String, PlatformProfile>,
    aliases: HashMap<String, String>,
}

impl PlatformRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in platform.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for entry in BUILTIN_PLATFORMS {
            registry.insert(entry.name, entry.transport, entry.escalation, (entry.definition)());
        }
        for (alias, target) in BUILTIN_ALIASES {
            registry
                .aliases
                .insert((*alias).to_string(), (*target).to_string());
        }
        registry
    }

    /// Register an additional platform.
    pub fn register(
        &mut self,
        transport: TransportKind,
        escalation: Escalation,
        definition: PlatformDefinition,
    ) -> Result<()> {
        if self.profiles.contains_key(&definition.name) {
            return Err(PlatformError::AlreadyRegistered {
                name: definition.name.clone(),
            }
            .into());
        }
        let name = definition.name.clone();
        self.insert(&name, transport, escalation, definition);
        Ok(())
    }

    fn insert(
        &mut self,
        name: &str,
        transport: TransportKind,
        escalation: Escalation,
        definition: PlatformDefinition,
    ) {
        self.profiles.insert(
            name.to_string(),
            PlatformProfile {
                name: name.to_string(),
                transport,
                escalation,
                definition: Arc::new(definition),
            },
        );
    }

    /// Look up the profile for a host's platform tag.
    ///
    /// A `_telnet` suffix selects the Telnet shell transport for the same
    /// vendor; a `_ssh` suffix is accepted and ignored. The host's own
    /// platform tag is never modified.
    pub fn resolve(&self, platform: &str) -> Result<PlatformProfile> {
        let tag = platform.trim().to_ascii_lowercase();
        let (base, forced) = split_transport_suffix(&tag);
        let canonical = self.aliases.get(base).map(String::as_str).unwrap_or(base);

        let profile = self
            .profiles
            .get(canonical)
            .ok_or_else(|| PlatformError::UnknownPlatform {
                name: platform.to_string(),
            })?;

        debug!("platform '{}' resolved to '{}'", platform, profile.name);

        Ok(match forced {
            Some(TransportKind::ShellTelnet) => profile.over_telnet(),
            _ => profile.clone(),
        })
    }

    /// Check if a platform is registered.
    pub fn contains(&self, platform: &str) -> bool {
        self.resolve(platform).is_ok()
    }
}

/// Split a transport suffix (`_telnet`, `_ssh`) off a platform tag.
pub fn split_transport_suffix(platform: &str) -> (&str, Option<TransportKind>) {
    if let Some(base) = platform.strip_suffix("_telnet") {
        (base, Some(TransportKind::ShellTelnet))
    } else if let Some(base) = platform.strip_suffix("_ssh") {
        (base, Some(TransportKind::ShellSsh))
    } else {
        (platform, None)
    }
}

//! Privilege level tracking and navigation.

use indexmap::IndexMap;
use regex::bytes::Regex;

use crate::error::{DriverError, Result};
use crate::platform::PrivilegeLevel;

/// Tracks the session's current privilege level and plans transitions.
///
/// Levels form a tree through `previous_priv`. A path between two levels
/// climbs from the start to the nearest common ancestor and descends to
/// the target.
#[derive(Debug)]
pub(crate) struct PrivilegeManager {
    levels: IndexMap<String, PrivilegeLevel>,
    current: Option<String>,
}

impl PrivilegeManager {
    /// Create a manager; the current level is unknown until a prompt is seen.
    pub(crate) fn new(levels: IndexMap<String, PrivilegeLevel>) -> Self {
        Self {
            levels,
            current: None,
        }
    }

    /// Find the level a prompt belongs to.
    pub(crate) fn determine_from_prompt(&self, prompt: &str) -> Result<&PrivilegeLevel> {
        self.levels
            .values()
            .find(|level| level.matches(prompt))
            .ok_or_else(|| {
                DriverError::UnknownPrivilege {
                    prompt: prompt.to_string(),
                }
                .into()
            })
    }

    /// Record the level a prompt belongs to as the current one.
    pub(crate) fn update_from_prompt(&mut self, prompt: &str) -> Result<&PrivilegeLevel> {
        let name = self.determine_from_prompt(prompt)?.name.clone();
        self.current = Some(name);
        self.current()
            .ok_or_else(|| DriverError::UnknownPrivilege {
                prompt: prompt.to_string(),
            }
            .into())
    }

    /// Current level, if a prompt has been recognised.
    pub(crate) fn current(&self) -> Option<&PrivilegeLevel> {
        self.current.as_ref().and_then(|name| self.levels.get(name))
    }

    /// Chain of level names from `name` up to its root.
    fn ancestry<'a>(&'a self, name: &'a str) -> Vec<&'a str> {
        let mut chain = vec![name];
        let mut node = name;
        while let Some(parent) = self
            .levels
            .get(node)
            .and_then(|level| level.previous_priv.as_deref())
        {
            // Malformed definitions must not loop forever
            if chain.contains(&parent) || chain.len() > self.levels.len() {
                break;
            }
            chain.push(parent);
            node = parent;
        }
        chain
    }

    /// Levels to traverse from `from` to `to`, both included.
    pub(crate) fn find_path(&self, from: &str, to: &str) -> Result<Vec<String>> {
        let no_path = || DriverError::NoPrivilegePath {
            from: from.to_string(),
            to: to.to_string(),
        };

        if !self.levels.contains_key(from) || !self.levels.contains_key(to) {
            return Err(no_path().into());
        }

        let up = self.ancestry(from);
        let down = self.ancestry(to);

        let (i, j) = up
            .iter()
            .enumerate()
            .find_map(|(i, name)| down.iter().position(|d| d == name).map(|j| (i, j)))
            .ok_or_else(no_path)?;

        let path = up[..=i]
            .iter()
            .chain(down[..j].iter().rev())
            .map(|name| name.to_string())
            .collect();
        Ok(path)
    }

    /// Command (and optional secret prompt) moving between adjacent levels.
    pub(crate) fn get_transition(&self, from: &str, to: &str) -> Option<Transition> {
        let from_level = self.levels.get(from)?;
        let to_level = self.levels.get(to)?;

        if to_level.previous_priv.as_deref() == Some(from) {
            return Some(Transition {
                command: to_level.escalate_command.clone()?,
                auth_prompt: to_level.escalate_prompt.clone(),
            });
        }

        if from_level.previous_priv.as_deref() == Some(to) {
            return Some(Transition {
                command: from_level.deescalate_command.clone()?,
                auth_prompt: None,
            });
        }

        None
    }
}

/// One hop in the privilege graph.
#[derive(Debug, Clone)]
pub(crate) struct Transition {
    /// Command to send.
    pub command: String,

    /// Secret prompt the device shows for this hop, if any.
    pub auth_prompt: Option<Regex>,
}

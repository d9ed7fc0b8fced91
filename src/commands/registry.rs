//! Command Registry
//!
//! Name and alias lookup for host-provided commands. Alias resolution runs
//! before name lookup, so an alias may shadow nothing but never a command.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::commands::types::{Command, CommandSummary};

pub struct CommandRegistry {
    commands: IndexMap<String, Arc<dyn Command>>,
    aliases: HashMap<String, String>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: IndexMap::new(),
            aliases: HashMap::new(),
        }
    }

    pub fn register(&mut self, command: Arc<dyn Command>) {
        for alias in command.aliases() {
            self.aliases
                .insert(alias.to_string(), command.name().to_string());
        }
        self.commands.insert(command.name().to_string(), command);
    }

    /// Look up by alias first, then by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Command>> {
        let canonical = self.aliases.get(name).map(|s| s.as_str()).unwrap_or(name);
        self.commands.get(canonical).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name) || self.commands.contains_key(name)
    }

    /// All registered commands, in registration order.
    pub fn list(&self) -> Vec<CommandSummary> {
        self.commands.values().map(|c| summary(c.as_ref())).collect()
    }

    /// Registered commands without the hidden ones.
    pub fn list_visible(&self) -> Vec<CommandSummary> {
        self.commands
            .values()
            .filter(|c| !c.hidden())
            .map(|c| summary(c.as_ref()))
            .collect()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn summary(command: &dyn Command) -> CommandSummary {
    CommandSummary {
        name: command.name(),
        description: command.description(),
        category: command.category(),
        hidden: command.hidden(),
    }
}

use std::sync::Arc;

use tracing::info;

use crate::bot::{
    commands::commands::Command,
    state::def::{BotError, BotResult},
};

pub mod args;
pub mod commands;
pub mod utility;

/// A named group of commands.
///
/// In a `unique_commands` category the word after the command name stays in
/// the argument list even when it selected a sub-command; elsewhere it is
/// always dropped. Such categories also refuse two commands sharing a name
/// or alias.
#[derive(Clone)]
pub struct Category {
    pub name: String,
    pub description: String,
    pub unique_commands: bool,
    pub commands: Vec<Arc<Command>>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Category { name: name.into(), description: String::new(), unique_commands: false, commands: Vec::new() }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn unique_commands(mut self, unique: bool) -> Self {
        self.unique_commands = unique;
        self
    }

    pub fn command(mut self, command: Command) -> Self {
        let command = command.adopt(&self.name);
        self.commands.push(command);
        self
    }

    /// Finds `token` by name or alias, then tries `sub` against that
    /// command's sub-commands, falling back to the command itself.
    pub fn get_command(&self, token: &str, sub: Option<&str>) -> Option<Resolution> {
        let command = self.commands.iter().find(|c| c.matches(token))?;
        let (command, consumed_sub) = match sub.and_then(|sub| command.find_sub_command(sub)) {
            Some(found) => (found, true),
            None => (command, false),
        };
        Some(Resolution { command: Arc::clone(command), consumed_sub, unique_commands: self.unique_commands })
    }

    fn check_unique(&self) -> BotResult<()> {
        if !self.unique_commands {
            return Ok(());
        }
        for (i, command) in self.commands.iter().enumerate() {
            let clash = self.commands[i + 1..]
                .iter()
                .any(|other| other.matches(&command.name) || command.aliases.iter().any(|a| other.matches(a)));
            if clash {
                return Err(BotError::DuplicateCommand { category: self.name.clone(), command: command.name.clone() });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub command: Arc<Command>,
    /// Whether the sub-command token matched a sub-command.
    pub consumed_sub: bool,
    /// The owning category's `unique_commands` flag.
    pub unique_commands: bool,
}

/// Categories in registration order.
#[derive(Default)]
pub struct CommandRegistry {
    categories: Vec<Category>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, category: Category) -> BotResult<()> {
        if self.category(&category.name).is_some() {
            return Err(BotError::DuplicateCategory(category.name));
        }
        category.check_unique()?;
        info!("Registered category {} ({} commands)", category.name, category.commands.len());
        self.categories.push(category);
        Ok(())
    }

    /// Replaces a registered category, keeping its position.
    pub fn update(&mut self, category: Category) -> BotResult<()> {
        category.check_unique()?;
        let slot = self
            .categories
            .iter_mut()
            .find(|c| c.name == category.name)
            .ok_or_else(|| BotError::CategoryNotFound(category.name.clone()))?;
        info!("Updated category {}", category.name);
        *slot = category;
        Ok(())
    }

    /// First category (in registration order) holding a match wins.
    pub fn resolve(&self, token: &str, sub: Option<&str>) -> Option<Resolution> {
        self.categories.iter().find_map(|category| category.get_command(token, sub))
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.categories.iter()
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

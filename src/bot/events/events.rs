use std::sync::Arc;

use crate::bot::{
    chat_event::chat_event::Invocation,
    commands::commands::Command,
    state::def::{AmethystBot, AmethystError},
};

pub type CommandHook = Arc<dyn Fn(&AmethystBot, &Command, &Invocation) + Send + Sync>;
pub type NotFoundHook = Arc<dyn Fn(&AmethystBot, &Invocation, &str) + Send + Sync>;
pub type ErrorHook = Arc<dyn Fn(&AmethystBot, &AmethystError, &Invocation) + Send + Sync>;

/// Command lifecycle hooks. All are optional; an absent `command_error`
/// hook makes failing command bodies propagate their error instead.
#[derive(Clone, Default)]
pub struct CommandEvents {
    pub command_start: Option<CommandHook>,
    pub command_end: Option<CommandHook>,
    pub command_not_found: Option<NotFoundHook>,
    pub command_error: Option<ErrorHook>,
}

impl CommandEvents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_command_start<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AmethystBot, &Command, &Invocation) + Send + Sync + 'static,
    {
        self.command_start = Some(Arc::new(hook));
        self
    }

    pub fn on_command_end<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AmethystBot, &Command, &Invocation) + Send + Sync + 'static,
    {
        self.command_end = Some(Arc::new(hook));
        self
    }

    pub fn on_command_not_found<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AmethystBot, &Invocation, &str) + Send + Sync + 'static,
    {
        self.command_not_found = Some(Arc::new(hook));
        self
    }

    pub fn on_command_error<F>(mut self, hook: F) -> Self
    where
        F: Fn(&AmethystBot, &AmethystError, &Invocation) + Send + Sync + 'static,
    {
        self.command_error = Some(Arc::new(hook));
        self
    }

    pub(crate) fn start(&self, bot: &AmethystBot, command: &Command, invocation: &Invocation) {
        if let Some(hook) = &self.command_start {
            hook(bot, command, invocation);
        }
    }

    pub(crate) fn end(&self, bot: &AmethystBot, command: &Command, invocation: &Invocation) {
        if let Some(hook) = &self.command_end {
            hook(bot, command, invocation);
        }
    }

    pub(crate) fn not_found(&self, bot: &AmethystBot, invocation: &Invocation, name: &str) {
        if let Some(hook) = &self.command_not_found {
            hook(bot, invocation, name);
        }
    }

    /// Returns false when no error hook is registered.
    pub(crate) fn error(&self, bot: &AmethystBot, error: &AmethystError, invocation: &Invocation) -> bool {
        match &self.command_error {
            Some(hook) => {
                hook(bot, error, invocation);
                true
            }
            None => false,
        }
    }
}

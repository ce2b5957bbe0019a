use std::sync::Arc;

use tracing::debug;

use crate::bot::{
    chat_event::chat_event::{Invocation, Snowflake},
    commands::commands::Command,
    state::def::{AmethystBot, AmethystError},
};

/// Where a command is about to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InhibitorContext {
    pub guild_id: Option<Snowflake>,
    pub channel_id: Snowflake,
    pub member_id: Snowflake,
}

impl From<&Invocation> for InhibitorContext {
    fn from(invocation: &Invocation) -> Self {
        InhibitorContext {
            guild_id: invocation.guild_id(),
            channel_id: invocation.channel_id(),
            member_id: invocation.author().id,
        }
    }
}

/// `Ok(())` lets the command through, `Err` vetoes it.
pub type Inhibitor = Arc<dyn Fn(&AmethystBot, &Command, &InhibitorContext) -> Result<(), AmethystError> + Send + Sync>;

/// Named gates, evaluated in registration order.
#[derive(Default, Clone)]
pub struct InhibitorChain {
    inhibitors: Vec<(String, Inhibitor)>,
}

impl InhibitorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chain with the owner/guild/dm gates installed.
    pub fn with_builtins() -> Self {
        let mut chain = Self::new();
        chain.insert("owner_only", Arc::new(owner_only));
        chain.insert("guild_only", Arc::new(guild_only));
        chain.insert("dm_only", Arc::new(dm_only));
        chain
    }

    /// Adds an inhibitor. A name that is already present keeps its position
    /// and gets the new predicate; returns true in that case.
    pub fn insert(&mut self, name: impl Into<String>, inhibitor: Inhibitor) -> bool {
        let name = name.into();
        match self.inhibitors.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => {
                slot.1 = inhibitor;
                true
            }
            None => {
                self.inhibitors.push((name, inhibitor));
                false
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.inhibitors.len();
        self.inhibitors.retain(|(existing, _)| existing != name);
        self.inhibitors.len() != before
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.inhibitors.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.inhibitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inhibitors.is_empty()
    }

    /// Runs every inhibitor exactly once and returns the veto of the
    /// earliest-registered one that refused.
    pub fn evaluate(&self, bot: &AmethystBot, command: &Command, ctx: &InhibitorContext) -> Option<AmethystError> {
        let mut veto = None;
        for (name, inhibitor) in &self.inhibitors {
            if let Err(error) = inhibitor(bot, command, ctx) {
                debug!("Inhibitor {} blocked {}: {}", name, command.id(), error);
                veto.get_or_insert(error);
            }
        }
        veto
    }
}

fn owner_only(bot: &AmethystBot, command: &Command, ctx: &InhibitorContext) -> Result<(), AmethystError> {
    if command.owner_only && !bot.config.owners.contains(&ctx.member_id) {
        return Err(AmethystError::OwnerOnly);
    }
    Ok(())
}

fn guild_only(bot: &AmethystBot, command: &Command, ctx: &InhibitorContext) -> Result<(), AmethystError> {
    if command.guild_only.unwrap_or(bot.config.guild_only) && ctx.guild_id.is_none() {
        return Err(AmethystError::GuildOnly);
    }
    Ok(())
}

fn dm_only(bot: &AmethystBot, command: &Command, ctx: &InhibitorContext) -> Result<(), AmethystError> {
    if command.dm_only.unwrap_or(bot.config.dm_only) && ctx.guild_id.is_some() {
        return Err(AmethystError::DmOnly);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::bot::test_support::{noop_command, test_bot};

    fn ctx(guild_id: Option<Snowflake>) -> InhibitorContext {
        InhibitorContext { guild_id, channel_id: 2, member_id: 3 }
    }

    #[tokio::test]
    async fn first_registered_veto_wins_and_every_gate_runs_once() {
        let bot = test_bot().build().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut chain = InhibitorChain::new();

        let counter = calls.clone();
        chain.insert("pass", Arc::new(move |_: &AmethystBot, _: &Command, _: &InhibitorContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));
        let counter = calls.clone();
        chain.insert("first", Arc::new(move |_: &AmethystBot, _: &Command, _: &InhibitorContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AmethystError::Custom("first".into()))
        }));
        let counter = calls.clone();
        chain.insert("second", Arc::new(move |_: &AmethystBot, _: &Command, _: &InhibitorContext| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(AmethystError::Custom("second".into()))
        }));

        let veto = chain.evaluate(&bot, &noop_command("ping"), &ctx(Some(1)));
        assert_eq!(veto, Some(AmethystError::Custom("first".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn reinserting_a_name_replaces_in_place() {
        let mut chain = InhibitorChain::new();
        chain.insert("a", Arc::new(|_: &AmethystBot, _: &Command, _: &InhibitorContext| Ok(())));
        chain.insert("b", Arc::new(|_: &AmethystBot, _: &Command, _: &InhibitorContext| Ok(())));
        let replaced = chain.insert("a", Arc::new(|_: &AmethystBot, _: &Command, _: &InhibitorContext| {
            Err(AmethystError::Other)
        }));

        assert!(replaced);
        assert_eq!(chain.names().collect::<Vec<_>>(), vec!["a", "b"]);

        let bot = test_bot().build().unwrap();
        assert_eq!(chain.evaluate(&bot, &noop_command("x"), &ctx(None)), Some(AmethystError::Other));

        assert!(chain.remove("a"));
        assert!(!chain.remove("a"));
        assert_eq!(chain.len(), 1);
    }

    #[tokio::test]
    async fn builtin_gates_follow_command_flags() {
        let bot = test_bot().build().unwrap();
        let chain = InhibitorChain::with_builtins();

        let owner = noop_command("shutdown").owner_only();
        assert_eq!(chain.evaluate(&bot, &owner, &ctx(Some(1))), Some(AmethystError::OwnerOnly));

        let guild = noop_command("ban").guild_only(true);
        assert_eq!(chain.evaluate(&bot, &guild, &ctx(None)), Some(AmethystError::GuildOnly));
        assert_eq!(chain.evaluate(&bot, &guild, &ctx(Some(1))), None);

        let dm = noop_command("secret").dm_only(true);
        assert_eq!(chain.evaluate(&bot, &dm, &ctx(Some(1))), Some(AmethystError::DmOnly));
        assert_eq!(chain.evaluate(&bot, &dm, &ctx(None)), None);
    }
}

use std::{collections::HashSet, fmt, sync::Arc};

use futures::future::BoxFuture;

use crate::bot::{
    chat_event::chat_event::{Author, Invocation, Snowflake},
    commands::args::{ArgResults, ArgSpec},
    state::def::{AmethystBot, BotResult, CooldownSpec},
};

/// Everything a command body gets besides the bot itself.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub invocation: Invocation,
    pub args: ArgResults,
}

impl CommandContext {
    pub fn author(&self) -> &Author {
        self.invocation.author()
    }

    pub fn channel_id(&self) -> Snowflake {
        self.invocation.channel_id()
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        self.invocation.guild_id()
    }
}

pub trait CommandT: Send + Sync {
    fn execute(&self, bot: Arc<AmethystBot>, ctx: CommandContext) -> BoxFuture<'static, BotResult<()>>;
}

pub struct FnCommand<F> {
    func: F,
}

impl<F> FnCommand<F>
where
    F: Fn(Arc<AmethystBot>, CommandContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
{
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> CommandT for FnCommand<F>
where
    F: Fn(Arc<AmethystBot>, CommandContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
{
    fn execute(&self, bot: Arc<AmethystBot>, ctx: CommandContext) -> BoxFuture<'static, BotResult<()>> {
        (self.func)(bot, ctx)
    }
}

/// A registered command. Sub-commands share their parent's `name` and carry
/// their own token in `sub_command`; their `aliases` match that token.
#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub aliases: HashSet<String>,
    pub description: String,
    pub usage: String,
    pub category: String,
    pub sub_command: Option<String>,
    pub sub_commands: Vec<Arc<Command>>,
    pub args: Vec<ArgSpec>,
    pub ignore_bots: Option<bool>,
    pub quoted_arguments: Option<bool>,
    pub cooldown: Option<CooldownSpec>,
    pub owner_only: bool,
    pub guild_only: Option<bool>,
    pub dm_only: Option<bool>,
    body: Arc<dyn CommandT>,
}

impl Command {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Arc<AmethystBot>, CommandContext) -> BoxFuture<'static, BotResult<()>> + Send + Sync + 'static,
    {
        Self::from_handler(name, Arc::new(FnCommand::new(func)))
    }

    pub fn from_handler(name: impl Into<String>, body: Arc<dyn CommandT>) -> Self {
        Command {
            name: name.into(),
            aliases: HashSet::new(),
            description: String::new(),
            usage: String::new(),
            category: String::new(),
            sub_command: None,
            sub_commands: Vec::new(),
            args: Vec::new(),
            ignore_bots: None,
            quoted_arguments: None,
            cooldown: None,
            owner_only: false,
            guild_only: None,
            dm_only: None,
            body,
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.insert(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn usage(mut self, usage: impl Into<String>) -> Self {
        self.usage = usage.into();
        self
    }

    pub fn arg(mut self, spec: ArgSpec) -> Self {
        self.args.push(spec);
        self
    }

    /// Attaches `sub` under this command; `sub`'s own name becomes the
    /// sub-command token.
    pub fn sub_command(mut self, mut sub: Command) -> Self {
        sub.sub_command = Some(std::mem::replace(&mut sub.name, self.name.clone()));
        self.sub_commands.push(Arc::new(sub));
        self
    }

    pub fn ignore_bots(mut self, ignore: bool) -> Self {
        self.ignore_bots = Some(ignore);
        self
    }

    pub fn quoted_arguments(mut self, quoted: bool) -> Self {
        self.quoted_arguments = Some(quoted);
        self
    }

    pub fn cooldown(mut self, cooldown: CooldownSpec) -> Self {
        self.cooldown = Some(cooldown);
        self
    }

    pub fn owner_only(mut self) -> Self {
        self.owner_only = true;
        self
    }

    pub fn guild_only(mut self, guild_only: bool) -> Self {
        self.guild_only = Some(guild_only);
        self
    }

    pub fn dm_only(mut self, dm_only: bool) -> Self {
        self.dm_only = Some(dm_only);
        self
    }

    /// Stable identity, also used as the cooldown ledger key.
    pub fn id(&self) -> String {
        match &self.sub_command {
            Some(sub) => format!("{}:{}:{}", self.category, self.name, sub),
            None => format!("{}:{}", self.category, self.name),
        }
    }

    /// Matches the command token against the name and aliases.
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.aliases.contains(token)
    }

    /// Matches a sub-command token against this sub-command.
    pub fn matches_sub(&self, token: &str) -> bool {
        self.sub_command.as_deref() == Some(token) || self.aliases.contains(token)
    }

    pub fn find_sub_command(&self, token: &str) -> Option<&Arc<Command>> {
        self.sub_commands.iter().find(|sub| sub.matches_sub(token))
    }

    pub fn execute(&self, bot: Arc<AmethystBot>, ctx: CommandContext) -> BoxFuture<'static, BotResult<()>> {
        self.body.execute(bot, ctx)
    }

    /// Moves the command (and its sub-commands) into `category`.
    pub(crate) fn adopt(mut self, category: &str) -> Arc<Command> {
        self.category = category.to_owned();
        self.sub_commands = self
            .sub_commands
            .into_iter()
            .map(|sub| Arc::unwrap_or_clone(sub).adopt(category))
            .collect();
        Arc::new(self)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("id", &self.id())
            .field("aliases", &self.aliases)
            .field("sub_commands", &self.sub_commands.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::noop_command;

    #[test]
    fn sub_command_takes_parent_name() {
        let cmd = noop_command("role").sub_command(noop_command("add").alias("a")).adopt("admin");
        let sub = cmd.find_sub_command("a").unwrap();

        assert_eq!(sub.name, "role");
        assert_eq!(sub.sub_command.as_deref(), Some("add"));
        assert_eq!(sub.category, "admin");
        assert_eq!(sub.id(), "admin:role:add");
        assert!(cmd.find_sub_command("remove").is_none());
    }

    #[test]
    fn matches_name_and_aliases_case_sensitively() {
        let cmd = noop_command("ping").alias("p");
        assert!(cmd.matches("ping"));
        assert!(cmd.matches("p"));
        assert!(!cmd.matches("PING"));
    }
}

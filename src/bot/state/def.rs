use std::{io, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::bot::{
    cache::cache::EntityCache,
    chat_event::chat_event::{BotMessage, ComponentInteraction, Reaction, Snowflake},
    collectors::collectors::CollectorRegistry,
    commands::CommandRegistry,
    cooldown::cooldown::CooldownTracker,
    dispatcher::dispatcher::Prefix,
    events::events::CommandEvents,
    handler::handler::BotClient,
    inhibitors::inhibitors::InhibitorChain,
    scheduler::tasks::TaskScheduler,
};

pub type BotResult<T> = Result<T, BotError>;

/// Process-wide bot state. Built once through [`AmethystBot::builder`] and
/// shared as `Arc<AmethystBot>` with every handler, hook and task.
pub struct AmethystBot {
    pub id: Snowflake,
    pub config: BotConfig,
    pub prefix: Prefix,
    pub client: Arc<dyn BotClient>,
    pub cache: EntityCache,
    pub events: CommandEvents,
    pub cooldowns: CooldownTracker,
    pub message_collectors: CollectorRegistry<String, BotMessage>,
    pub component_collectors: CollectorRegistry<Snowflake, ComponentInteraction>,
    pub reaction_collectors: CollectorRegistry<Snowflake, Reaction>,
    pub(crate) categories: RwLock<CommandRegistry>,
    pub(crate) inhibitors: RwLock<InhibitorChain>,
    pub(crate) tasks: TaskScheduler,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct BotConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
    #[serde(default)]
    pub prefix_case_sensitive: bool,
    #[serde(default)]
    pub bot_mention_as_prefix: bool,
    #[serde(default = "default_true")]
    pub ignore_bots: bool,
    #[serde(default)]
    pub message_quoted_arguments: bool,
    #[serde(default)]
    pub guild_only: bool,
    #[serde(default)]
    pub dm_only: bool,
    // Users allowed through `owner_only` commands.
    #[serde(default)]
    pub owners: Vec<Snowflake>,
    #[serde(default)]
    pub ignore_cooldown: Vec<Snowflake>,
    #[serde(default)]
    pub default_cooldown: Option<CooldownSpec>,
    #[serde(default = "default_collector_timeout")]
    pub collector_timeout_secs: u64,
}

/// How many times an invoker may run a command inside one window.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CooldownSpec {
    pub window_secs: u64,
    pub max_uses: u32,
}

impl CooldownSpec {
    pub fn new(window: Duration, max_uses: u32) -> Self {
        CooldownSpec { window_secs: window.as_secs(), max_uses }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

pub(crate) fn default_prefix() -> String {
    "!".into()
}

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_collector_timeout() -> u64 {
    60
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Discord error: {0}")]
    Serenity(#[from] serenity::Error),
    #[error("JSON deserialization error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),
    #[error("Category `{0}` is already registered")]
    DuplicateCategory(String),
    #[error("Command `{command}` is registered twice in category `{category}`")]
    DuplicateCommand { category: String, command: String },
    #[error("Category `{0}` does not exist")]
    CategoryNotFound(String),
    #[error("There was an issue fetching {entity} {id}")]
    FetchFailed { entity: &'static str, id: Snowflake },
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Custom(String),
}

/// Reason a command did not run, handed to the `command_error` hook.
/// These are values, never propagated as `Err`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmethystError {
    #[error("command is on cooldown for another {}s", remaining.as_secs())]
    Cooldown { remaining: Duration },
    #[error("only bot owners can use this command")]
    OwnerOnly,
    #[error("this command can only be used in a server")]
    GuildOnly,
    #[error("this command can only be used in direct messages")]
    DmOnly,
    #[error("something went wrong while running the command")]
    Other,
    #[error("{0}")]
    Custom(String),
}

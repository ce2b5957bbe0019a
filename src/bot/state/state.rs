use std::{env, fs, path::Path, sync::Arc, time::Duration};

use tokio::sync::RwLock;
use tracing::info;

use crate::bot::{
    cache::cache::EntityCache,
    chat_event::chat_event::{message_collector_key, BotMessage, ComponentInteraction, Reaction, Snowflake},
    collectors::collectors::{CollectorError, CollectorOptions, CollectorRegistry},
    commands::{commands::Command, Category, CommandRegistry},
    cooldown::cooldown::CooldownTracker,
    dispatcher::dispatcher::Prefix,
    events::events::CommandEvents,
    handler::handler::BotClient,
    inhibitors::inhibitors::{Inhibitor, InhibitorChain, InhibitorContext},
    scheduler::tasks::{Task, TaskScheduler},
    state::def::{
        default_collector_timeout, default_prefix, AmethystBot, AmethystError, BotConfig, BotError, BotResult,
        CooldownSpec,
    },
};

impl Default for BotConfig {
    fn default() -> Self {
        BotConfig {
            prefix: default_prefix(),
            prefix_case_sensitive: false,
            bot_mention_as_prefix: false,
            ignore_bots: true,
            message_quoted_arguments: false,
            guild_only: false,
            dm_only: false,
            owners: Vec::new(),
            ignore_cooldown: Vec::new(),
            default_cooldown: None,
            collector_timeout_secs: default_collector_timeout(),
        }
    }
}

impl BotConfig {
    /// Loads a JSON config file; absent fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> BotResult<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Builds a config from `AMETHYST_*` variables (a `.env` file is read
    /// first if present).
    pub fn from_env() -> BotResult<Self> {
        dotenvy::dotenv().ok();
        let mut cfg = BotConfig::default();

        if let Ok(prefix) = env::var("AMETHYST_PREFIX") {
            cfg.prefix = prefix;
        }
        cfg.prefix_case_sensitive = env_flag("AMETHYST_PREFIX_CASE_SENSITIVE", cfg.prefix_case_sensitive)?;
        cfg.bot_mention_as_prefix = env_flag("AMETHYST_MENTION_PREFIX", cfg.bot_mention_as_prefix)?;
        cfg.ignore_bots = env_flag("AMETHYST_IGNORE_BOTS", cfg.ignore_bots)?;
        cfg.message_quoted_arguments = env_flag("AMETHYST_QUOTED_ARGUMENTS", cfg.message_quoted_arguments)?;
        cfg.guild_only = env_flag("AMETHYST_GUILD_ONLY", cfg.guild_only)?;
        cfg.dm_only = env_flag("AMETHYST_DM_ONLY", cfg.dm_only)?;
        cfg.owners = env_ids("AMETHYST_OWNERS")?;
        cfg.ignore_cooldown = env_ids("AMETHYST_IGNORE_COOLDOWN")?;

        if let Ok(raw) = env::var("AMETHYST_COLLECTOR_TIMEOUT") {
            cfg.collector_timeout_secs = raw
                .parse()
                .map_err(|_| BotError::Config(format!("AMETHYST_COLLECTOR_TIMEOUT is not a number: {raw}")))?;
        }
        if let Ok(raw) = env::var("AMETHYST_COOLDOWN") {
            cfg.default_cooldown = Some(parse_cooldown(&raw)?);
        }

        Ok(cfg)
    }

    pub fn collector_timeout(&self) -> Duration {
        Duration::from_secs(self.collector_timeout_secs)
    }
}

fn env_flag(key: &str, default: bool) -> BotResult<bool> {
    match env::var(key) {
        Ok(raw) => parse_flag(&raw).ok_or_else(|| BotError::Config(format!("{key} is not a boolean: {raw}"))),
        Err(_) => Ok(default),
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn env_ids(key: &str) -> BotResult<Vec<Snowflake>> {
    match env::var(key) {
        Ok(raw) => parse_ids(&raw).ok_or_else(|| BotError::Config(format!("{key} must be comma separated ids"))),
        Err(_) => Ok(Vec::new()),
    }
}

fn parse_ids(raw: &str) -> Option<Vec<Snowflake>> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| id.parse().ok())
        .collect()
}

/// `"<uses>/<seconds>"`, e.g. `3/10` for three uses every ten seconds.
fn parse_cooldown(raw: &str) -> BotResult<CooldownSpec> {
    let invalid = || BotError::Config(format!("AMETHYST_COOLDOWN must look like 3/10, got {raw}"));
    let (uses, secs) = raw.split_once('/').ok_or_else(invalid)?;
    Ok(CooldownSpec {
        max_uses: uses.trim().parse().map_err(|_| invalid())?,
        window_secs: secs.trim().parse().map_err(|_| invalid())?,
    })
}

pub struct AmethystBotBuilder {
    id: Snowflake,
    config: BotConfig,
    prefix: Option<Prefix>,
    client: Arc<dyn BotClient>,
    categories: Vec<Category>,
    inhibitors: InhibitorChain,
    events: CommandEvents,
}

impl AmethystBotBuilder {
    /// The bot's own user id, used for mention prefixes.
    pub fn id(mut self, id: Snowflake) -> Self {
        self.id = id;
        self
    }

    pub fn config(mut self, config: BotConfig) -> Self {
        self.config = config;
        self
    }

    /// Overrides `config.prefix`.
    pub fn prefix(mut self, prefix: Prefix) -> Self {
        self.prefix = Some(prefix);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.categories.push(category);
        self
    }

    pub fn inhibitor<F>(mut self, name: impl Into<String>, inhibitor: F) -> Self
    where
        F: Fn(&AmethystBot, &Command, &InhibitorContext) -> Result<(), AmethystError> + Send + Sync + 'static,
    {
        self.inhibitors.insert(name, Arc::new(inhibitor));
        self
    }

    pub fn events(mut self, events: CommandEvents) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> BotResult<Arc<AmethystBot>> {
        let mut registry = CommandRegistry::new();
        for category in self.categories {
            registry.register(category)?;
        }

        let timeout = self.config.collector_timeout();
        let prefix = self.prefix.unwrap_or_else(|| Prefix::Static(self.config.prefix.clone()));
        let cooldowns = CooldownTracker::new(self.config.ignore_cooldown.iter().copied());

        Ok(Arc::new(AmethystBot {
            id: self.id,
            prefix,
            client: self.client,
            cache: EntityCache::new(),
            events: self.events,
            cooldowns,
            message_collectors: CollectorRegistry::new(timeout),
            component_collectors: CollectorRegistry::new(timeout),
            reaction_collectors: CollectorRegistry::new(timeout),
            categories: RwLock::new(registry),
            inhibitors: RwLock::new(self.inhibitors),
            tasks: TaskScheduler::default(),
            config: self.config,
        }))
    }
}

impl AmethystBot {
    /// Starts a builder with the owner/guild/dm inhibitors installed.
    pub fn builder(client: Arc<dyn BotClient>) -> AmethystBotBuilder {
        AmethystBotBuilder {
            id: 0,
            config: BotConfig::default(),
            prefix: None,
            client,
            categories: Vec::new(),
            inhibitors: InhibitorChain::with_builtins(),
            events: CommandEvents::default(),
        }
    }

    pub async fn create_category(&self, category: Category) -> BotResult<()> {
        self.categories.write().await.register(category)
    }

    pub async fn update_category(&self, category: Category) -> BotResult<()> {
        self.categories.write().await.update(category)
    }

    pub async fn resolve_command(&self, name: &str, sub: Option<&str>) -> Option<Arc<Command>> {
        self.categories.read().await.resolve(name, sub).map(|r| r.command)
    }

    /// Registers `inhibitor` under `name`, replacing any inhibitor already
    /// registered under it.
    pub async fn create_inhibitor(&self, name: impl Into<String>, inhibitor: Inhibitor) {
        let name = name.into();
        if self.inhibitors.write().await.insert(name.clone(), inhibitor) {
            info!("Replaced inhibitor {}", name);
        }
    }

    pub async fn delete_inhibitor(&self, name: &str) -> bool {
        self.inhibitors.write().await.remove(name)
    }

    pub fn create_task(self: &Arc<Self>, task: Task) {
        self.tasks.spawn(Arc::clone(self), task);
    }

    pub fn clear_tasks(&self) {
        self.tasks.clear();
    }

    /// Next message from `member_id` in `channel_id`.
    pub async fn await_message(
        &self,
        member_id: Snowflake,
        channel_id: Snowflake,
        options: CollectorOptions<BotMessage>,
    ) -> Result<BotMessage, CollectorError> {
        let key = message_collector_key(member_id, channel_id);
        self.message_collectors.subscribe(key, options.max_usage(1)).one().await
    }

    /// Up to `options.max_usage` messages from `member_id` in `channel_id`.
    pub async fn await_messages(
        &self,
        member_id: Snowflake,
        channel_id: Snowflake,
        options: CollectorOptions<BotMessage>,
    ) -> Result<Vec<BotMessage>, CollectorError> {
        let key = message_collector_key(member_id, channel_id);
        self.message_collectors.subscribe(key, options).many().await
    }

    pub async fn await_component(
        &self,
        message_id: Snowflake,
        options: CollectorOptions<ComponentInteraction>,
    ) -> Result<ComponentInteraction, CollectorError> {
        self.component_collectors.subscribe(message_id, options.max_usage(1)).one().await
    }

    pub async fn await_components(
        &self,
        message_id: Snowflake,
        options: CollectorOptions<ComponentInteraction>,
    ) -> Result<Vec<ComponentInteraction>, CollectorError> {
        self.component_collectors.subscribe(message_id, options).many().await
    }

    pub async fn await_reaction(
        &self,
        message_id: Snowflake,
        options: CollectorOptions<Reaction>,
    ) -> Result<Reaction, CollectorError> {
        self.reaction_collectors.subscribe(message_id, options.max_usage(1)).one().await
    }

    pub async fn await_reactions(
        &self,
        message_id: Snowflake,
        options: CollectorOptions<Reaction>,
    ) -> Result<Vec<Reaction>, CollectorError> {
        self.reaction_collectors.subscribe(message_id, options).many().await
    }

    /// Rejects every pending collector and stops all tasks.
    pub fn shutdown(&self) {
        info!("Shutting down: {} task(s) running", self.tasks.len());
        self.message_collectors.reject_all(CollectorError::Shutdown);
        self.component_collectors.reject_all(CollectorError::Shutdown);
        self.reaction_collectors.reject_all(CollectorError::Shutdown);
        self.tasks.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::test_support::{noop_command, test_bot};

    #[test]
    fn json_config_fills_defaults() {
        let cfg: BotConfig = serde_json::from_str(r#"{ "prefix": "?", "owners": [1, 2] }"#).unwrap();

        assert_eq!(cfg.prefix, "?");
        assert_eq!(cfg.owners, vec![1, 2]);
        assert!(cfg.ignore_bots);
        assert_eq!(cfg.collector_timeout(), Duration::from_secs(60));
        assert_eq!(cfg, BotConfig { prefix: "?".into(), owners: vec![1, 2], ..BotConfig::default() });
    }

    #[test]
    fn env_values_parse() {
        assert_eq!(parse_flag(" Yes "), Some(true));
        assert_eq!(parse_flag("maybe"), None);
        assert_eq!(parse_ids("1, 2,,3"), Some(vec![1, 2, 3]));
        assert_eq!(parse_ids("1,x"), None);
        assert_eq!(parse_cooldown("3/10").unwrap(), CooldownSpec { max_uses: 3, window_secs: 10 });
        assert!(parse_cooldown("3").is_err());
    }

    #[tokio::test]
    async fn builder_rejects_duplicate_categories() {
        let result = test_bot().category(Category::new("a")).category(Category::new("a")).build();
        assert!(matches!(result, Err(BotError::DuplicateCategory(_))));
    }

    #[tokio::test]
    async fn categories_can_be_added_after_build() {
        let bot = test_bot().build().unwrap();
        bot.create_category(Category::new("fun").command(noop_command("roll").alias("dice"))).await.unwrap();

        assert!(bot.resolve_command("dice", None).await.is_some());
        assert!(bot.create_category(Category::new("fun")).await.is_err());
    }

    #[tokio::test]
    async fn message_await_resolves_from_feed() {
        let bot = test_bot().build().unwrap();
        let waiter = {
            let bot = bot.clone();
            tokio::spawn(async move { bot.await_message(1, 2, CollectorOptions::new()).await })
        };
        while !bot.message_collectors.contains(&message_collector_key(1, 2)) {
            tokio::task::yield_now().await;
        }

        let reply = crate::bot::test_support::message(1, 2, "yes");
        assert!(bot.message_collectors.feed(&message_collector_key(1, 2), &reply));
        assert_eq!(waiter.await.unwrap().map(|m| m.content), Ok("yes".to_string()));
    }

    #[tokio::test]
    async fn shutdown_rejects_pending_awaits() {
        let bot = test_bot().build().unwrap();
        let pending = bot.reaction_collectors.subscribe(9, CollectorOptions::new());

        bot.shutdown();
        assert_eq!(pending.one().await, Err(CollectorError::Shutdown));
    }
}

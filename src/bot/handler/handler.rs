use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::bot::{
    cache::cache::{Channel, Guild, Member},
    chat_event::chat_event::{
        message_collector_key, BotMessage, ComponentInteraction, InteractionCommand, Invocation, Reaction, Snowflake,
    },
    commands::Resolution,
    dispatcher::dispatcher::{dispatch_message, execute_command, ArgInput},
    state::def::{AmethystBot, BotError, BotResult},
};

/// Entity fetches and replies, provided by the platform client.
#[async_trait]
pub trait BotClient: Send + Sync {
    async fn fetch_guild(&self, guild_id: Snowflake) -> BotResult<Option<Guild>>;
    async fn fetch_channel(&self, channel_id: Snowflake) -> BotResult<Option<Channel>>;
    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> BotResult<Option<Member>>;
    async fn send_message(&self, channel_id: Snowflake, content: &str) -> BotResult<()>;
}

/// Feeds the message collectors, then runs the command dispatcher.
pub async fn handle_message(bot: &Arc<AmethystBot>, message: BotMessage) -> BotResult<()> {
    let key = message_collector_key(message.author.id, message.channel_id);
    if bot.message_collectors.feed(&key, &message) {
        debug!("Message {} went to a collector", message.id);
    }
    dispatch_message(bot, &message).await
}

pub fn handle_reaction(bot: &AmethystBot, reaction: Reaction) -> bool {
    bot.reaction_collectors.feed(&reaction.message_id, &reaction)
}

pub fn handle_component(bot: &AmethystBot, component: ComponentInteraction) -> bool {
    bot.component_collectors.feed(&component.message_id, &component)
}

/// Runs a slash command through the same registry, cooldowns and
/// inhibitors as message commands.
pub async fn handle_interaction(bot: &Arc<AmethystBot>, interaction: InteractionCommand) -> BotResult<()> {
    let resolution = bot
        .categories
        .read()
        .await
        .resolve(&interaction.name, interaction.sub_command.as_deref());
    let name = interaction.name.clone();
    let options = interaction.options.clone();
    let (guild_id, channel_id, user_id) = (interaction.guild_id, interaction.channel_id, interaction.user.id);
    let invocation = Invocation::Interaction(interaction);

    let Some(Resolution { command, .. }) = resolution else {
        debug!("Slash command not found: {}", name);
        bot.events.not_found(bot, &invocation, &name);
        return Ok(());
    };

    hydrate(bot, guild_id, channel_id, user_id, invocation.member()).await?;

    info!("{} ran /{} in channel {}", invocation.author().name, command.id(), channel_id);
    bot.events.start(bot, &command, &invocation);
    execute_command(bot, &command, &invocation, ArgInput::Options(options)).await?;
    bot.events.end(bot, &command, &invocation);
    Ok(())
}

/// Makes sure the invoking member, guild and channel are cached, fetching
/// what is missing. Fetch failures are not retried.
pub(crate) async fn hydrate(
    bot: &AmethystBot,
    guild_id: Option<Snowflake>,
    channel_id: Snowflake,
    user_id: Snowflake,
    member: Option<&Member>,
) -> BotResult<()> {
    if let Some(guild_id) = guild_id {
        if !bot.cache.has_member(guild_id, user_id) {
            let member = match member {
                Some(member) => member.clone(),
                None => bot
                    .client
                    .fetch_member(guild_id, user_id)
                    .await?
                    .ok_or(BotError::FetchFailed { entity: "member", id: user_id })?,
            };
            bot.cache.insert_member(member);
        }

        if !bot.cache.has_guild(guild_id) {
            let guild = bot
                .client
                .fetch_guild(guild_id)
                .await?
                .ok_or(BotError::FetchFailed { entity: "guild", id: guild_id })?;
            bot.cache.insert_guild(guild);
        }
    }

    if !bot.cache.has_channel(channel_id) {
        let channel = bot
            .client
            .fetch_channel(channel_id)
            .await?
            .ok_or(BotError::FetchFailed { entity: "channel", id: channel_id })?;
        bot.cache.insert_channel(channel);
    }

    Ok(())
}

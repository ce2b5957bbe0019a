use std::sync::Arc;

use chrono::{DateTime, Utc};
use serenity::{
    all::{
        ChannelId, CommandDataOption, CommandDataOptionValue, CommandInteraction, ComponentInteractionDataKind,
        Context, EventHandler, GuildId, Interaction, Message, Ready, UserId,
    },
    async_trait,
    http::Http,
    model::channel::Channel as SerenityChannel,
};
use tracing::{debug, error, info};

use crate::bot::{
    cache::cache::{Channel, Guild, Member},
    chat_event::chat_event::{
        Attachment, Author, BotMessage, ComponentInteraction, InteractionCommand, InteractionOption, Reaction,
        Snowflake,
    },
    handler::handler::{handle_component, handle_interaction, handle_message, handle_reaction, BotClient},
    state::def::{AmethystBot, BotResult},
};

/// [`BotClient`] over Discord's REST API.
pub struct SerenityClient {
    http: Arc<Http>,
}

impl SerenityClient {
    pub fn new(http: Arc<Http>) -> Self {
        SerenityClient { http }
    }
}

/// A 404 means the entity is gone; anything else is a real failure.
fn missing<T>(result: serenity::Result<T>) -> BotResult<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(serenity::Error::Http(e)) if e.status_code().is_some_and(|s| s.as_u16() == 404) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[async_trait]
impl BotClient for SerenityClient {
    async fn fetch_guild(&self, guild_id: Snowflake) -> BotResult<Option<Guild>> {
        let guild = missing(self.http.get_guild(GuildId::new(guild_id)).await)?;
        Ok(guild.map(|g| Guild { id: g.id.get(), name: g.name, owner_id: g.owner_id.get() }))
    }

    async fn fetch_channel(&self, channel_id: Snowflake) -> BotResult<Option<Channel>> {
        let channel = missing(self.http.get_channel(ChannelId::new(channel_id)).await)?;
        Ok(channel.map(map_channel))
    }

    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> BotResult<Option<Member>> {
        let member = missing(self.http.get_member(GuildId::new(guild_id), UserId::new(user_id)).await)?;
        Ok(member.as_ref().map(map_member))
    }

    async fn send_message(&self, channel_id: Snowflake, content: &str) -> BotResult<()> {
        ChannelId::new(channel_id).say(&self.http, content).await?;
        Ok(())
    }
}

/// Serenity gateway events, forwarded to the bot.
pub struct DiscordHandler {
    bot: Arc<AmethystBot>,
}

impl DiscordHandler {
    pub fn new(bot: Arc<AmethystBot>) -> Self {
        DiscordHandler { bot }
    }
}

#[async_trait]
impl EventHandler for DiscordHandler {
    async fn message(&self, _ctx: Context, msg: Message) {
        if let Err(e) = handle_message(&self.bot, map_message(&msg)).await {
            error!("Message {} failed: {e}", msg.id);
        }
    }

    async fn reaction_add(&self, _ctx: Context, reaction: serenity::all::Reaction) {
        if handle_reaction(&self.bot, map_reaction(&reaction)) {
            debug!("Reaction on {} collected", reaction.message_id);
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        match interaction {
            Interaction::Component(component) => {
                if let Err(e) = component.defer(&ctx.http).await {
                    error!("Could not acknowledge component {}: {e}", component.id);
                }
                handle_component(&self.bot, map_component(&component));
            }
            Interaction::Command(command) => {
                if let Err(e) = command.defer_ephemeral(&ctx.http).await {
                    error!("Could not acknowledge /{}: {e}", command.data.name);
                    return;
                }
                if let Err(e) = handle_interaction(&self.bot, map_command(&command)).await {
                    error!("/{} failed: {e}", command.data.name);
                }
                if let Err(e) = command.delete_response(&ctx.http).await {
                    debug!("Could not clear deferred response: {e}");
                }
            }
            _ => {}
        }
    }

    async fn ready(&self, _ctx: Context, ready: Ready) {
        info!("{} is connected to {} guild(s)", ready.user.name, ready.guilds.len());
    }
}

fn map_author(user: &serenity::all::User) -> Author {
    Author { id: user.id.get(), name: user.name.clone(), bot: user.bot }
}

fn map_channel(channel: SerenityChannel) -> Channel {
    match channel {
        SerenityChannel::Guild(c) => {
            Channel { id: c.id.get(), guild_id: Some(c.guild_id.get()), name: Some(c.name), nsfw: c.nsfw }
        }
        other => Channel { id: other.id().get(), guild_id: None, name: None, nsfw: false },
    }
}

fn map_member(member: &serenity::all::Member) -> Member {
    Member {
        guild_id: member.guild_id.get(),
        user_id: member.user.id.get(),
        nick: member.nick.clone(),
        roles: member.roles.iter().map(|r| r.get()).collect(),
    }
}

pub fn map_message(msg: &Message) -> BotMessage {
    let member = match (msg.guild_id, msg.member.as_ref()) {
        (Some(guild_id), Some(partial)) => Some(Member {
            guild_id: guild_id.get(),
            user_id: msg.author.id.get(),
            nick: partial.nick.clone(),
            roles: partial.roles.iter().map(|r| r.get()).collect(),
        }),
        _ => None,
    };

    BotMessage {
        id: msg.id.get(),
        channel_id: msg.channel_id.get(),
        guild_id: msg.guild_id.map(|g| g.get()),
        author: map_author(&msg.author),
        member,
        content: msg.content.clone(),
        mentions: msg.mentions.iter().map(|u| u.id.get()).collect(),
        attachments: msg
            .attachments
            .iter()
            .map(|a| Attachment { id: a.id.get(), filename: a.filename.clone(), url: a.url.clone() })
            .collect(),
        timestamp: DateTime::from_timestamp(msg.timestamp.unix_timestamp(), 0).unwrap_or_else(Utc::now),
    }
}

pub fn map_reaction(reaction: &serenity::all::Reaction) -> Reaction {
    Reaction {
        message_id: reaction.message_id.get(),
        channel_id: reaction.channel_id.get(),
        guild_id: reaction.guild_id.map(|g| g.get()),
        user_id: reaction.user_id.map(|u| u.get()),
        emoji: reaction.emoji.to_string(),
    }
}

pub fn map_component(component: &serenity::all::ComponentInteraction) -> ComponentInteraction {
    let values = match &component.data.kind {
        ComponentInteractionDataKind::StringSelect { values } => values.clone(),
        _ => Vec::new(),
    };

    ComponentInteraction {
        id: component.id.get(),
        message_id: component.message.id.get(),
        channel_id: component.channel_id.get(),
        guild_id: component.guild_id.map(|g| g.get()),
        user_id: component.user.id.get(),
        custom_id: component.data.custom_id.clone(),
        values,
    }
}

/// Flattens a leading sub-command option into `sub_command`.
pub fn map_command(command: &CommandInteraction) -> InteractionCommand {
    let (sub_command, options) = match command.data.options.first() {
        Some(CommandDataOption { name, value: CommandDataOptionValue::SubCommand(inner), .. }) => {
            (Some(name.clone()), map_options(inner))
        }
        _ => (None, map_options(&command.data.options)),
    };

    InteractionCommand {
        id: command.id.get(),
        name: command.data.name.clone(),
        sub_command,
        options,
        channel_id: command.channel_id.get(),
        guild_id: command.guild_id.map(|g| g.get()),
        user: map_author(&command.user),
        member: command.member.as_deref().map(map_member),
    }
}

fn map_options(options: &[CommandDataOption]) -> Vec<InteractionOption> {
    options
        .iter()
        .filter_map(|option| {
            let value = match &option.value {
                CommandDataOptionValue::String(s) => s.clone(),
                CommandDataOptionValue::Integer(i) => i.to_string(),
                CommandDataOptionValue::Number(n) => n.to_string(),
                CommandDataOptionValue::Boolean(b) => b.to_string(),
                CommandDataOptionValue::User(id) => id.get().to_string(),
                CommandDataOptionValue::Channel(id) => id.get().to_string(),
                CommandDataOptionValue::Role(id) => id.get().to_string(),
                CommandDataOptionValue::Mentionable(id) => id.get().to_string(),
                CommandDataOptionValue::Attachment(id) => id.get().to_string(),
                _ => return None,
            };
            Some(InteractionOption { name: option.name.clone(), value })
        })
        .collect()
}

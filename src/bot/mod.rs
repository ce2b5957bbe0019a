pub mod state;
pub mod chat_event;
pub mod cache;
pub mod collectors;
pub mod cooldown;
pub mod dispatcher;
pub mod commands;
pub mod events;
pub mod inhibitors;
pub mod platforms;
pub mod handler;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;

    use async_trait::async_trait;
    use chrono::Utc;

    use crate::bot::{
        cache::cache::{Channel, Guild, Member},
        chat_event::chat_event::{Author, BotMessage, Snowflake},
        commands::commands::Command,
        handler::handler::BotClient,
        state::{def::{AmethystBot, BotResult}, state::AmethystBotBuilder},
    };

    /// Client that finds every entity and swallows replies.
    pub struct NullClient;

    #[async_trait]
    impl BotClient for NullClient {
        async fn fetch_guild(&self, guild_id: Snowflake) -> BotResult<Option<Guild>> {
            Ok(Some(Guild { id: guild_id, name: "guild".into(), owner_id: 0 }))
        }

        async fn fetch_channel(&self, channel_id: Snowflake) -> BotResult<Option<Channel>> {
            Ok(Some(Channel { id: channel_id, guild_id: None, name: None, nsfw: false }))
        }

        async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> BotResult<Option<Member>> {
            Ok(Some(Member { guild_id, user_id, nick: None, roles: Vec::new() }))
        }

        async fn send_message(&self, _channel_id: Snowflake, _content: &str) -> BotResult<()> {
            Ok(())
        }
    }

    pub fn test_bot() -> AmethystBotBuilder {
        AmethystBot::builder(Arc::new(NullClient)).id(999)
    }

    pub fn noop_command(name: &str) -> Command {
        Command::new(name, |_bot, _ctx| Box::pin(async move { Ok(()) }))
    }

    pub fn message(author_id: Snowflake, channel_id: Snowflake, content: &str) -> BotMessage {
        BotMessage {
            id: 1,
            channel_id,
            guild_id: None,
            author: Author { id: author_id, name: format!("user{author_id}"), bot: false },
            member: None,
            content: content.into(),
            mentions: Vec::new(),
            attachments: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

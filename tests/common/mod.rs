#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use amethyst::{
    bot::{
        cache::cache::{Channel, Guild, Member},
        events::events::CommandEvents,
        state::state::AmethystBotBuilder,
    },
    AmethystBot, Author, BotClient, BotMessage, BotResult, Snowflake,
};
use async_trait::async_trait;
use chrono::Utc;

/// Records replies; can pretend channels do not exist.
#[derive(Default)]
pub struct RecordingClient {
    pub sent: Mutex<Vec<(Snowflake, String)>>,
    pub channels_missing: bool,
}

impl RecordingClient {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().iter().map(|(_, content)| content.clone()).collect()
    }
}

#[async_trait]
impl BotClient for RecordingClient {
    async fn fetch_guild(&self, guild_id: Snowflake) -> BotResult<Option<Guild>> {
        Ok(Some(Guild { id: guild_id, name: "test guild".into(), owner_id: 1 }))
    }

    async fn fetch_channel(&self, channel_id: Snowflake) -> BotResult<Option<Channel>> {
        if self.channels_missing {
            return Ok(None);
        }
        Ok(Some(Channel { id: channel_id, guild_id: None, name: Some("general".into()), nsfw: false }))
    }

    async fn fetch_member(&self, guild_id: Snowflake, user_id: Snowflake) -> BotResult<Option<Member>> {
        Ok(Some(Member { guild_id, user_id, nick: None, roles: Vec::new() }))
    }

    async fn send_message(&self, channel_id: Snowflake, content: &str) -> BotResult<()> {
        self.sent.lock().unwrap().push((channel_id, content.to_owned()));
        Ok(())
    }
}

pub fn builder(client: &Arc<RecordingClient>) -> AmethystBotBuilder {
    AmethystBot::builder(client.clone()).id(42)
}

/// Hooks that append a line per lifecycle event to `log`.
pub fn recording_events(log: &Arc<Mutex<Vec<String>>>) -> CommandEvents {
    let (start, end, missing, failed) = (log.clone(), log.clone(), log.clone(), log.clone());
    CommandEvents::new()
        .on_command_start(move |_, command, _| start.lock().unwrap().push(format!("start {}", command.id())))
        .on_command_end(move |_, command, _| end.lock().unwrap().push(format!("end {}", command.id())))
        .on_command_not_found(move |_, _, name| missing.lock().unwrap().push(format!("not_found {name}")))
        .on_command_error(move |_, error, _| failed.lock().unwrap().push(format!("error {error}")))
}

pub fn message(author_id: Snowflake, channel_id: Snowflake, content: &str) -> BotMessage {
    BotMessage {
        id: 7,
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

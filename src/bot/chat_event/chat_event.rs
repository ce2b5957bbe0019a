use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::bot::cache::cache::Member;

pub type Snowflake = u64;

static MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"^<(@!?|@&|#)(\d+)>$").expect("mention regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MentionKind {
    User,
    Role,
    Channel,
}

/// Parses `<@id>`, `<@!id>`, `<@&id>` or `<#id>`.
pub fn mention(raw: &str) -> Option<(MentionKind, Snowflake)> {
    let caps = MENTION.captures(raw.trim())?;
    let kind = match &caps[1] {
        "@&" => MentionKind::Role,
        "#" => MentionKind::Channel,
        _ => MentionKind::User,
    };
    Some((kind, caps[2].parse().ok()?))
}

/// Key used by message collectors: one pending collector per member per channel.
pub fn message_collector_key(member_id: Snowflake, channel_id: Snowflake) -> String {
    format!("{member_id}:{channel_id}")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: Snowflake,
    pub name: String,
    pub bot: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct BotMessage {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub author: Author,
    pub member: Option<Member>,
    pub content: String,
    pub mentions: Vec<Snowflake>,
    pub attachments: Vec<Attachment>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub user_id: Option<Snowflake>,
    pub emoji: String,
}

/// A button press or select-menu choice on a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInteraction {
    pub id: Snowflake,
    pub message_id: Snowflake,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub user_id: Snowflake,
    pub custom_id: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionOption {
    pub name: String,
    pub value: String,
}

/// A slash command invocation.
#[derive(Debug, Clone)]
pub struct InteractionCommand {
    pub id: Snowflake,
    pub name: String,
    pub sub_command: Option<String>,
    pub options: Vec<InteractionOption>,
    pub channel_id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub user: Author,
    pub member: Option<Member>,
}

/// What triggered a command run.
#[derive(Debug, Clone)]
pub enum Invocation {
    Message(BotMessage),
    Interaction(InteractionCommand),
}

impl Invocation {
    pub fn author(&self) -> &Author {
        match self {
            Invocation::Message(msg) => &msg.author,
            Invocation::Interaction(cmd) => &cmd.user,
        }
    }

    pub fn channel_id(&self) -> Snowflake {
        match self {
            Invocation::Message(msg) => msg.channel_id,
            Invocation::Interaction(cmd) => cmd.channel_id,
        }
    }

    pub fn guild_id(&self) -> Option<Snowflake> {
        match self {
            Invocation::Message(msg) => msg.guild_id,
            Invocation::Interaction(cmd) => cmd.guild_id,
        }
    }

    pub fn member(&self) -> Option<&Member> {
        match self {
            Invocation::Message(msg) => msg.member.as_ref(),
            Invocation::Interaction(cmd) => cmd.member.as_ref(),
        }
    }

    pub fn attachments(&self) -> &[Attachment] {
        match self {
            Invocation::Message(msg) => &msg.attachments,
            Invocation::Interaction(_) => &[],
        }
    }

    /// Users the message mentions; empty for slash commands.
    pub fn mentions(&self) -> &[Snowflake] {
        match self {
            Invocation::Message(msg) => &msg.mentions,
            Invocation::Interaction(_) => &[],
        }
    }
}

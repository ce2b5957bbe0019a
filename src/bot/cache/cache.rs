use dashmap::DashMap;

use crate::bot::chat_event::chat_event::Snowflake;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Guild {
    pub id: Snowflake,
    pub name: String,
    pub owner_id: Snowflake,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: Snowflake,
    pub guild_id: Option<Snowflake>,
    pub name: Option<String>,
    pub nsfw: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub guild_id: Snowflake,
    pub user_id: Snowflake,
    pub nick: Option<String>,
    pub roles: Vec<Snowflake>,
}

/// Guilds, channels and members seen or fetched so far.
/// Members are keyed by `(guild_id, user_id)`.
#[derive(Default)]
pub struct EntityCache {
    guilds: DashMap<Snowflake, Guild>,
    channels: DashMap<Snowflake, Channel>,
    members: DashMap<(Snowflake, Snowflake), Member>,
}

impl EntityCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn guild(&self, id: Snowflake) -> Option<Guild> {
        self.guilds.get(&id).map(|g| g.clone())
    }

    pub fn has_guild(&self, id: Snowflake) -> bool {
        self.guilds.contains_key(&id)
    }

    pub fn insert_guild(&self, guild: Guild) {
        self.guilds.insert(guild.id, guild);
    }

    pub fn channel(&self, id: Snowflake) -> Option<Channel> {
        self.channels.get(&id).map(|c| c.clone())
    }

    pub fn has_channel(&self, id: Snowflake) -> bool {
        self.channels.contains_key(&id)
    }

    pub fn insert_channel(&self, channel: Channel) {
        self.channels.insert(channel.id, channel);
    }

    pub fn member(&self, guild_id: Snowflake, user_id: Snowflake) -> Option<Member> {
        self.members.get(&(guild_id, user_id)).map(|m| m.clone())
    }

    pub fn has_member(&self, guild_id: Snowflake, user_id: Snowflake) -> bool {
        self.members.contains_key(&(guild_id, user_id))
    }

    pub fn insert_member(&self, member: Member) {
        self.members.insert((member.guild_id, member.user_id), member);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn members_are_scoped_per_guild() {
        let cache = EntityCache::new();
        cache.insert_member(Member { guild_id: 1, user_id: 10, nick: None, roles: vec![] });

        assert!(cache.has_member(1, 10));
        assert!(!cache.has_member(2, 10));
        assert_eq!(cache.member(1, 10).map(|m| m.user_id), Some(10));
    }
}

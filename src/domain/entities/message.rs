use super::User;

/// Represents an incoming message from a guild channel or a DM
#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub channel_id: u64,
    pub guild_id: Option<u64>,
    pub author: User,
    pub content: String,
    pub mentions: Vec<User>,
    pub platform: String,
}

impl Message {
    pub fn new(id: u64, channel_id: u64, author: User, content: impl Into<String>) -> Self {
        Self {
            id,
            channel_id,
            guild_id: None,
            author,
            content: content.into(),
            mentions: Vec::new(),
            platform: "unknown".to_string(),
        }
    }

    pub fn in_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<User>) -> Self {
        self.mentions = mentions;
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = platform.into();
        self
    }

    /// Look up a mentioned user by id
    pub fn mentioned(&self, id: u64) -> Option<&User> {
        self.mentions.iter().find(|u| u.id == id)
    }
}

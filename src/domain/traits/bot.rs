use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::watch;
use crate::application::errors::BotError;
use crate::domain::entities::{Message, User};

/// Looks users up on the platform by id
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// `Ok(None)` when the platform knows no such user
    async fn fetch_user(&self, user_id: u64) -> Result<Option<User>, BotError>;
}

/// Bot trait - abstraction for messaging platform adapters
#[async_trait]
pub trait Bot: UserLookup + Send + Sync {
    /// Start the bot and feed incoming events to `events` until shutdown
    async fn start(&self, events: Arc<dyn EventHandler>) -> Result<(), BotError>;

    /// Send a text message to a channel, returning the new message id
    async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64, BotError>;

    /// Send one page of a paginated view with its navigation controls
    async fn send_page(&self, channel_id: u64, view: &PageView) -> Result<u64, BotError>;

    /// Replace a previously sent page in place
    async fn edit_page(&self, channel_id: u64, message_id: u64, view: &PageView) -> Result<(), BotError>;

    /// Delete a message
    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), BotError>;

    /// React to a message with a unicode emoji
    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), BotError>;

    /// Get bot info
    fn bot_info(&self) -> BotInfo;
}

/// Receiver of platform events, implemented by the message service
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// The platform connection is up. `owner_id` is the application owner, when known.
    async fn on_ready(&self, info: BotInfo, owner_id: Option<u64>);

    async fn on_message(&self, message: Message);

    /// A navigation control was pressed on `message_id`.
    /// Returns whether the press was handled.
    async fn on_component(&self, message_id: u64, user_id: u64, custom_id: &str) -> bool;

    /// Flips to `true` when the adapter should stop listening
    fn shutdown_signal(&self) -> watch::Receiver<bool>;
}

/// A rendered page: title, boxed body and a `Page i/n` footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageView {
    pub title: String,
    pub body: String,
    pub footer: String,
}

impl PageView {
    /// Rendering for surfaces that cannot show embeds
    pub fn to_plain(&self) -> String {
        format!("**{}**\n{}\n{}", self.title, self.body, self.footer)
    }
}

/// Bot information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotInfo {
    pub id: u64,
    pub name: String,
}

impl BotInfo {
    pub fn as_user(&self) -> User {
        User::new(self.id).with_name(self.name.clone()).bot()
    }
}

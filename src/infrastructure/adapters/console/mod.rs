//! Console adapter for development/testing
//!
//! Every stdin line becomes a guild message from the configured user.
//! Lines of the form `pager:<action>` drive the most recently sent page.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::application::errors::BotError;
use crate::application::pagination::PageAction;
use crate::domain::entities::{Message, User};
use crate::domain::traits::{Bot, BotInfo, EventHandler, PageView, UserLookup};

pub const CONSOLE_GUILD: u64 = 0;
pub const CONSOLE_CHANNEL: u64 = 0;

/// Console bot adapter for local development
pub struct ConsoleAdapter {
    info: BotInfo,
    user_id: u64,
    next_id: AtomicU64,
    last_page: AtomicU64,
}

impl ConsoleAdapter {
    /// `user_id` is who typed lines are sent as
    pub fn new(user_id: u64) -> Self {
        Self {
            info: BotInfo {
                id: 1,
                name: "cogbot".to_string(),
            },
            user_id,
            next_id: AtomicU64::new(1),
            last_page: AtomicU64::new(0),
        }
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn message(&self, text: &str) -> Message {
        let author = User::new(self.user_id).with_name("console");
        Message::new(self.next_id(), CONSOLE_CHANNEL, author, text)
            .in_guild(CONSOLE_GUILD)
            .with_platform("console")
    }

    async fn handle_line(&self, events: &Arc<dyn EventHandler>, line: &str) {
        if PageAction::from_custom_id(line).is_some() {
            let page = self.last_page.load(Ordering::Relaxed);
            if !events.on_component(page, self.user_id, line).await {
                println!("[BOT] (no active page)");
            }
            return;
        }
        events.on_message(self.message(line)).await;
    }
}

/// The console has no user directory: every id except the bot's is a person
#[async_trait]
impl UserLookup for ConsoleAdapter {
    async fn fetch_user(&self, user_id: u64) -> Result<Option<User>, BotError> {
        Ok(Some(if user_id == self.info.id {
            self.info.as_user()
        } else {
            User::new(user_id)
        }))
    }
}

#[async_trait]
impl Bot for ConsoleAdapter {
    async fn start(&self, events: Arc<dyn EventHandler>) -> Result<(), BotError> {
        tracing::info!("Starting console bot (dev mode)");
        events.on_ready(self.info.clone(), None).await;

        let mut shutdown = events.shutdown_signal();
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            if *shutdown.borrow_and_update() {
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if !line.is_empty() {
                            self.handle_line(&events, line).await;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => return Err(BotError::Network(format!("Failed to read stdin: {}", e))),
                },
            }
        }
        tracing::info!("Console bot stopped");
        Ok(())
    }

    async fn send_message(&self, _channel_id: u64, text: &str) -> Result<u64, BotError> {
        println!("[BOT] {}", text);
        Ok(self.next_id())
    }

    async fn send_page(&self, _channel_id: u64, view: &PageView) -> Result<u64, BotError> {
        let id = self.next_id();
        println!("[BOT] {}", view.to_plain());
        let controls: Vec<String> = PageAction::ALL
            .iter()
            .map(|a| format!("{} {}", a.emoji(), a.custom_id()))
            .collect();
        println!("  [Buttons] {}", controls.join(" | "));
        self.last_page.store(id, Ordering::Relaxed);
        Ok(id)
    }

    async fn edit_page(&self, _channel_id: u64, _message_id: u64, view: &PageView) -> Result<(), BotError> {
        println!("[BOT] {}", view.to_plain());
        Ok(())
    }

    async fn delete_message(&self, _channel_id: u64, message_id: u64) -> Result<(), BotError> {
        println!("[BOT] (deleted message {})", message_id);
        Ok(())
    }

    async fn add_reaction(&self, _channel_id: u64, _message_id: u64, emoji: &str) -> Result<(), BotError> {
        println!("[BOT] {}", emoji);
        Ok(())
    }

    fn bot_info(&self) -> BotInfo {
        self.info.clone()
    }
}

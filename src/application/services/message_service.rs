use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;

use crate::application::errors::BotError;
use crate::application::messaging::{MessageDispatcher, Reply};
use crate::application::pagination::{pagify, PageAction, Paginator, Transition};
use crate::domain::entities::Message;
use crate::domain::traits::{Bot, BotInfo, EventHandler};
use super::bot_service::BotService;

/// Longest text a single platform message may carry
pub const MESSAGE_LIMIT: usize = 2000;

/// A paginated view that is still accepting input
struct PageSession {
    channel_id: u64,
    paginator: Paginator,
    expires_at: Instant,
}

/// Service for processing messages: dispatch, then deliver the replies
pub struct MessageService<B: Bot> {
    bot: Arc<B>,
    dispatcher: MessageDispatcher,
    core: Arc<BotService>,
    sessions: Mutex<HashMap<u64, PageSession>>,
    timeout: Duration,
}

impl<B: Bot + 'static> MessageService<B> {
    pub fn new(bot: Arc<B>, dispatcher: MessageDispatcher, core: Arc<BotService>) -> Self {
        let timeout = Duration::from_secs(core.config().pagination.timeout_seconds);
        Self {
            bot,
            dispatcher,
            core,
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn bot(&self) -> &Arc<B> {
        &self.bot
    }

    pub fn core(&self) -> &Arc<BotService> {
        &self.core
    }

    /// Process an incoming message and send whatever the command produced
    pub async fn process(&self, message: Message) -> Result<(), BotError> {
        let channel_id = message.channel_id;
        let message_id = message.id;

        let replies = self
            .dispatcher
            .dispatch(message, &self.bot.bot_info(), self.bot.clone())
            .await;
        for reply in replies {
            self.deliver(channel_id, message_id, reply).await?;
        }
        Ok(())
    }

    async fn deliver(&self, channel_id: u64, message_id: u64, reply: Reply) -> Result<(), BotError> {
        match reply {
            Reply::Text(text) => {
                if text.chars().count() <= MESSAGE_LIMIT {
                    self.bot.send_message(channel_id, &text).await?;
                } else {
                    for chunk in pagify(&text, MESSAGE_LIMIT) {
                        self.bot.send_message(channel_id, &chunk).await?;
                    }
                }
            }
            Reply::Tick(check) => {
                // A missing reaction is not worth failing the command over
                if let Err(e) = self.bot.add_reaction(channel_id, message_id, Reply::emoji(check)).await {
                    tracing::warn!("Could not react to {}: {}", message_id, e);
                }
            }
            Reply::Pages(paginator) => {
                let page_id = self.bot.send_page(channel_id, &paginator.view()).await?;
                let mut sessions = self.sessions.lock().await;
                let now = Instant::now();
                sessions.retain(|_, s| s.expires_at > now);
                sessions.insert(page_id, PageSession {
                    channel_id,
                    paginator,
                    expires_at: now + self.timeout,
                });
            }
            Reply::Shutdown => self.core.request_shutdown(),
        }
        Ok(())
    }

    /// Apply a navigation control to the session shown in `message_id`.
    ///
    /// Returns `false` when there is no live session there or when `user_id`
    /// is not the author of the invoking command.
    pub async fn handle_page_action(
        &self,
        message_id: u64,
        user_id: u64,
        action: PageAction,
    ) -> Result<bool, BotError> {
        let mut sessions = self.sessions.lock().await;
        let Some(expires_at) = sessions.get(&message_id).map(|s| s.expires_at) else {
            return Ok(false);
        };
        if expires_at <= Instant::now() {
            sessions.remove(&message_id);
            tracing::debug!("Page session {} timed out", message_id);
            return Ok(false);
        }

        let Some(session) = sessions.get_mut(&message_id) else {
            return Ok(false);
        };
        if session.paginator.author_id() != user_id {
            return Ok(false);
        }

        let channel_id = session.channel_id;
        let transition = session.paginator.apply(action);
        match transition {
            Transition::Show(view) => {
                drop(sessions);
                self.bot.edit_page(channel_id, message_id, &view).await?;
            }
            Transition::Close => {
                sessions.remove(&message_id);
                drop(sessions);
                self.bot.delete_message(channel_id, message_id).await?;
            }
        }
        Ok(true)
    }

    pub async fn active_sessions(&self) -> usize {
        let now = Instant::now();
        self.sessions
            .lock()
            .await
            .values()
            .filter(|s| s.expires_at > now)
            .count()
    }
}

#[async_trait]
impl<B: Bot + 'static> EventHandler for MessageService<B> {
    async fn on_ready(&self, info: BotInfo, owner_id: Option<u64>) {
        tracing::info!("Logged in as {} ({})", info.name, info.id);
        if let Some(owner_id) = owner_id {
            self.core.add_owner(owner_id);
        }
    }

    async fn on_message(&self, message: Message) {
        let message_id = message.id;
        if let Err(e) = self.process(message).await {
            tracing::error!("Failed to answer message {}: {}", message_id, e);
        }
    }

    async fn on_component(&self, message_id: u64, user_id: u64, custom_id: &str) -> bool {
        let Some(action) = PageAction::from_custom_id(custom_id) else {
            return false;
        };
        match self.handle_page_action(message_id, user_id, action).await {
            Ok(handled) => handled,
            Err(e) => {
                tracing::error!("Page action on {} failed: {}", message_id, e);
                false
            }
        }
    }

    fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.core.shutdown_signal()
    }
}

//! Discord adapter built on serenity's gateway client and HTTP API

use async_trait::async_trait;
use serenity::all::{
    ButtonStyle, Channel, ChannelId, Client, Context, CreateActionRow, CreateButton, CreateEmbed,
    CreateEmbedFooter, CreateInteractionResponse, CreateMessage, EditMessage, EventHandler,
    GatewayIntents, Interaction, MessageId, Permissions, ReactionType, Ready, Timestamp, UserId,
};
use serenity::http::Http;
use serenity::model::channel::Message as DiscordMessage;
use serenity::model::user::User as DiscordUser;
use std::sync::{Arc, RwLock};

use crate::application::errors::BotError;
use crate::application::pagination::PageAction;
use crate::domain::entities::{Message, User};
use crate::domain::traits::{Bot, BotInfo, EventHandler as Events, PageView, UserLookup};

const EMBED_COLOUR: u32 = 0x00FFFF;

/// How a page is rendered in a given channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PageStyle {
    Embed,
    /// Bold title, boxed body and footer as message content
    Plain,
}

impl PageStyle {
    /// `None` means no guild permissions apply (a DM)
    fn for_permissions(permissions: Option<Permissions>) -> Self {
        match permissions {
            Some(permissions) if !permissions.embed_links() => PageStyle::Plain,
            _ => PageStyle::Embed,
        }
    }
}

/// Discord bot adapter
pub struct DiscordAdapter {
    token: String,
    http: Arc<Http>,
    info: Arc<RwLock<BotInfo>>,
}

impl DiscordAdapter {
    pub fn new(token: impl Into<String>) -> Self {
        let token = token.into();
        Self {
            http: Arc::new(Http::new(&token)),
            token,
            info: Arc::new(RwLock::new(BotInfo {
                id: 0,
                name: "discord".to_string(),
            })),
        }
    }

    fn page_embed(view: &PageView) -> CreateEmbed {
        CreateEmbed::new()
            .title(&view.title)
            .description(&view.body)
            .colour(EMBED_COLOUR)
            .footer(CreateEmbedFooter::new(&view.footer))
            .timestamp(Timestamp::now())
    }

    /// The bot's permissions in `channel_id`, `None` outside guilds
    async fn channel_permissions(&self, channel_id: u64) -> Result<Option<Permissions>, BotError> {
        let me = self.bot_info().id;
        if me == 0 {
            return Err(BotError::Internal("bot user is not known before ready".to_string()));
        }

        let channel = ChannelId::new(channel_id)
            .to_channel(&*self.http)
            .await
            .map_err(network)?;
        let Channel::Guild(channel) = channel else {
            return Ok(None);
        };

        let guild = self.http.get_guild(channel.guild_id).await.map_err(network)?;
        let member = self
            .http
            .get_member(channel.guild_id, UserId::new(me))
            .await
            .map_err(network)?;
        Ok(Some(guild.user_permissions_in(&channel, &member)))
    }

    async fn page_style(&self, channel_id: u64) -> PageStyle {
        match self.channel_permissions(channel_id).await {
            Ok(permissions) => PageStyle::for_permissions(permissions),
            Err(e) => {
                tracing::warn!("Could not read permissions in {}, sending plain pages: {}", channel_id, e);
                PageStyle::Plain
            }
        }
    }

    fn page_controls() -> Vec<CreateActionRow> {
        let buttons = PageAction::ALL
            .into_iter()
            .map(|action| {
                let style = match action {
                    PageAction::Stop => ButtonStyle::Danger,
                    _ => ButtonStyle::Secondary,
                };
                CreateButton::new(action.custom_id())
                    .emoji(ReactionType::Unicode(action.emoji().to_string()))
                    .style(style)
            })
            .collect();
        vec![CreateActionRow::Buttons(buttons)]
    }
}

fn network(e: serenity::Error) -> BotError {
    BotError::Network(e.to_string())
}

fn to_user(user: &DiscordUser) -> User {
    let converted = User::new(user.id.get()).with_name(user.name.clone());
    if user.bot {
        converted.bot()
    } else {
        converted
    }
}

fn to_message(msg: &DiscordMessage) -> Message {
    let mut message = Message::new(msg.id.get(), msg.channel_id.get(), to_user(&msg.author), msg.content.clone())
        .with_mentions(msg.mentions.iter().map(to_user).collect())
        .with_platform("discord");
    if let Some(guild_id) = msg.guild_id {
        message = message.in_guild(guild_id.get());
    }
    message
}

/// Forwards gateway events to the application
struct Handler {
    events: Arc<dyn Events>,
    info: Arc<RwLock<BotInfo>>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        let info = BotInfo {
            id: ready.user.id.get(),
            name: ready.user.name.clone(),
        };
        match self.info.write() {
            Ok(mut current) => *current = info.clone(),
            Err(poisoned) => *poisoned.into_inner() = info.clone(),
        }

        let owner_id = match ctx.http.get_current_application_info().await {
            Ok(app) => app.owner.map(|owner| owner.id.get()),
            Err(e) => {
                tracing::warn!("Could not fetch application info: {}", e);
                None
            }
        };
        self.events.on_ready(info, owner_id).await;
    }

    async fn message(&self, _ctx: Context, msg: DiscordMessage) {
        self.events.on_message(to_message(&msg)).await;
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        let Interaction::Component(component) = interaction else {
            return;
        };

        if let Err(e) = component
            .create_response(&ctx.http, CreateInteractionResponse::Acknowledge)
            .await
        {
            tracing::warn!("Could not acknowledge interaction: {}", e);
        }

        let handled = self
            .events
            .on_component(component.message.id.get(), component.user.id.get(), &component.data.custom_id)
            .await;
        if !handled {
            tracing::debug!(
                "Ignored '{}' from {} on {}",
                component.data.custom_id,
                component.user.id,
                component.message.id
            );
        }
    }
}

#[async_trait]
impl UserLookup for DiscordAdapter {
    async fn fetch_user(&self, user_id: u64) -> Result<Option<User>, BotError> {
        if user_id == 0 {
            return Ok(None);
        }
        match self.http.get_user(UserId::new(user_id)).await {
            Ok(user) => Ok(Some(to_user(&user))),
            // Unknown or malformed ids come back as client errors
            Err(serenity::Error::Http(ref e)) if e.status_code().is_some_and(|s| s.is_client_error()) => {
                tracing::debug!("No Discord user {}: {}", user_id, e);
                Ok(None)
            }
            Err(e) => Err(network(e)),
        }
    }
}

#[async_trait]
impl Bot for DiscordAdapter {
    async fn start(&self, events: Arc<dyn Events>) -> Result<(), BotError> {
        let intents = GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::DIRECT_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut shutdown = events.shutdown_signal();
        let handler = Handler {
            events,
            info: self.info.clone(),
        };
        let mut client = Client::builder(&self.token, intents)
            .event_handler(handler)
            .await
            .map_err(network)?;

        let shard_manager = client.shard_manager.clone();
        tokio::spawn(async move {
            loop {
                let stop = *shutdown.borrow_and_update();
                if stop || shutdown.changed().await.is_err() {
                    break;
                }
            }
            tracing::info!("Closing gateway connection");
            shard_manager.shutdown_all().await;
        });

        tracing::info!("Starting Discord bot");
        client.start().await.map_err(network)
    }

    async fn send_message(&self, channel_id: u64, text: &str) -> Result<u64, BotError> {
        let sent = ChannelId::new(channel_id)
            .send_message(&*self.http, CreateMessage::new().content(text))
            .await
            .map_err(network)?;
        Ok(sent.id.get())
    }

    async fn send_page(&self, channel_id: u64, view: &PageView) -> Result<u64, BotError> {
        let message = match self.page_style(channel_id).await {
            PageStyle::Embed => CreateMessage::new().embed(Self::page_embed(view)),
            PageStyle::Plain => CreateMessage::new().content(view.to_plain()),
        }
        .components(Self::page_controls());
        let sent = ChannelId::new(channel_id)
            .send_message(&*self.http, message)
            .await
            .map_err(network)?;
        Ok(sent.id.get())
    }

    async fn edit_page(&self, channel_id: u64, message_id: u64, view: &PageView) -> Result<(), BotError> {
        let edit = match self.page_style(channel_id).await {
            PageStyle::Embed => EditMessage::new().content("").embed(Self::page_embed(view)),
            PageStyle::Plain => EditMessage::new().content(view.to_plain()).embeds(Vec::new()),
        }
        .components(Self::page_controls());
        ChannelId::new(channel_id)
            .edit_message(&*self.http, MessageId::new(message_id), edit)
            .await
            .map_err(network)?;
        Ok(())
    }

    async fn delete_message(&self, channel_id: u64, message_id: u64) -> Result<(), BotError> {
        ChannelId::new(channel_id)
            .delete_message(&*self.http, MessageId::new(message_id))
            .await
            .map_err(network)
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), BotError> {
        ChannelId::new(channel_id)
            .create_reaction(&*self.http, MessageId::new(message_id), ReactionType::Unicode(emoji.to_string()))
            .await
            .map_err(network)
    }

    fn bot_info(&self) -> BotInfo {
        match self.info.read() {
            Ok(info) => info.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

//! Middleware system for message processing pipeline

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use crate::application::errors::CommandError;
use crate::application::services::BotService;
use crate::domain::entities::{Message, User};
use crate::domain::traits::UserLookup;
use super::parser::{Args, Invocation};

/// Context passed through middleware chain and into command handlers
#[derive(Clone)]
pub struct Context {
    pub message: Message,
    /// The bot's own user
    pub me: User,
    /// Prefix the invocation used
    pub prefix: String,
    /// Command name exactly as typed
    pub invoked_with: String,
    /// Qualified command name (`tag create`) once resolved
    pub command: Option<String>,
    lookup: Option<Arc<dyn UserLookup>>,
}

impl Context {
    pub fn new(message: Message, me: User, invocation: &Invocation) -> Self {
        Self {
            message,
            me,
            prefix: invocation.prefix.clone(),
            invoked_with: invocation.name.clone(),
            command: None,
            lookup: None,
        }
    }

    /// Resolve users the message does not describe through `lookup`
    pub fn with_lookup(mut self, lookup: Arc<dyn UserLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    pub fn author(&self) -> &User {
        &self.message.author
    }

    pub fn guild_id(&self) -> Option<u64> {
        self.message.guild_id
    }

    pub fn channel_id(&self) -> u64 {
        self.message.channel_id
    }

    pub fn command_name(&self) -> &str {
        self.command.as_deref().unwrap_or(&self.invoked_with)
    }

    /// User `id` as the bot itself, the author, a mentioned user, or
    /// whatever the platform reports. `None` when the user does not exist.
    pub async fn resolve_user(&self, id: u64) -> Result<Option<User>, CommandError> {
        if id == self.me.id {
            return Ok(Some(self.me.clone()));
        }
        if id == self.message.author.id {
            return Ok(Some(self.message.author.clone()));
        }
        if let Some(user) = self.message.mentioned(id) {
            return Ok(Some(user.clone()));
        }

        match self.lookup {
            Some(ref lookup) => lookup
                .fetch_user(id)
                .await
                .map_err(|e| CommandError::ExecutionFailed(format!("user lookup failed: {}", e))),
            None => Ok(None),
        }
    }

    /// Greedily consume user references from `args`, stopping before the
    /// first word that does not resolve to a user. Duplicates are dropped.
    pub async fn users(&self, args: &mut Args) -> Result<Vec<User>, CommandError> {
        let mut users: Vec<User> = Vec::new();
        loop {
            let mut ahead = args.clone();
            let Some(id) = ahead.next_user() else {
                break;
            };
            let Some(user) = self.resolve_user(id).await? else {
                break;
            };
            *args = ahead;
            if !users.iter().any(|u| u.id == user.id) {
                users.push(user);
            }
        }
        Ok(users)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("message", &self.message)
            .field("me", &self.me)
            .field("prefix", &self.prefix)
            .field("invoked_with", &self.invoked_with)
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

/// Middleware trait - processors that can intercept and modify message handling
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Process a message and optionally modify the context
    async fn process(&self, ctx: Context, next: Next) -> MiddlewareResult;
}

/// Result of middleware processing
pub type MiddlewareResult = Result<Context, MiddlewareError>;

/// Middleware errors
#[derive(Debug, Clone)]
pub enum MiddlewareError {
    /// Stop processing without telling the user
    Blocked(String),
}

impl std::fmt::Display for MiddlewareError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MiddlewareError::Blocked(msg) => write!(f, "Blocked: {}", msg),
        }
    }
}

impl std::error::Error for MiddlewareError {}

/// Next middleware in chain
#[derive(Clone)]
pub struct Next {
    remaining: Arc<Vec<Arc<dyn Middleware>>>,
}

impl Next {
    pub fn new(middlewares: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            remaining: Arc::new(middlewares),
        }
    }

    /// Process remaining middleware
    pub async fn run(self, ctx: Context) -> MiddlewareResult {
        match self.remaining.split_first() {
            Some((first, rest)) => {
                let next = Next::new(rest.to_vec());
                first.process(ctx, next).await
            }
            // No more middleware, processing complete
            None => Ok(ctx),
        }
    }
}

/// Drops messages from blacklisted users before any command runs
pub struct BlacklistMiddleware {
    service: Arc<BotService>,
}

impl BlacklistMiddleware {
    pub fn new(service: Arc<BotService>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl Middleware for BlacklistMiddleware {
    async fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        if self.service.is_blocked(ctx.author().id).await {
            return Err(MiddlewareError::Blocked(format!(
                "user {} is blacklisted",
                ctx.author().id
            )));
        }
        next.run(ctx).await
    }
}

/// Logging middleware for debugging
pub struct LoggingMiddleware;

#[async_trait]
impl Middleware for LoggingMiddleware {
    async fn process(&self, ctx: Context, next: Next) -> MiddlewareResult {
        let channel_id = ctx.channel_id();
        let preview = ctx.message.content.chars().take(50).collect::<String>();

        tracing::debug!(
            "[{}:{}] {} ({}): {}",
            ctx.message.platform,
            channel_id,
            ctx.author(),
            ctx.author().id,
            preview
        );

        let result = next.run(ctx).await;

        match &result {
            Ok(_) => {
                tracing::debug!("[{}] Passed middleware", channel_id);
            }
            Err(e) => {
                tracing::debug!("[{}] Stopped: {}", channel_id, e);
            }
        }

        result
    }
}

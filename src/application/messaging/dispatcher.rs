//! Message dispatcher - Routes messages to cogs

use std::sync::Arc;
use crate::application::errors::CommandError;
use crate::application::services::command_service::{CommandOwner, CommandService, ResolvedCommand, HELP_COMMAND};
use crate::application::services::BotService;
use crate::domain::entities::Message;
use crate::domain::traits::{BotInfo, UserLookup};
use super::middleware::{Context, Middleware, MiddlewareError, Next};
use super::parser::{Args, MessageParser};
use super::reply::Reply;

/// Shown when a command fails for reasons the user cannot fix
pub const COMMAND_ERRORED: &str = "I'm sorry! That command errored.";

/// Message dispatcher - routes messages through middleware to cogs
pub struct MessageDispatcher {
    parser: MessageParser,
    middleware: Vec<Arc<dyn Middleware>>,
    commands: CommandService,
    service: Arc<BotService>,
}

impl MessageDispatcher {
    pub fn new(service: Arc<BotService>, commands: CommandService) -> Self {
        Self {
            parser: MessageParser::new(),
            middleware: Vec::new(),
            commands,
            service,
        }
    }

    /// Add middleware to the chain
    pub fn with_middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn commands(&self) -> &CommandService {
        &self.commands
    }

    /// Process a message and return what should be sent back.
    ///
    /// Never fails: command errors are turned into replies (or silence) here.
    /// `users` resolves user arguments that the message itself does not describe.
    pub async fn dispatch(&self, message: Message, me: &BotInfo, users: Arc<dyn UserLookup>) -> Vec<Reply> {
        if message.author.is_bot {
            return Vec::new();
        }

        let prefixes = self.service.get_prefixes(message.guild_id, me.id).await;
        let Some(invocation) = self.parser.parse(&message.content, &prefixes) else {
            return Vec::new();
        };

        let ctx = Context::new(message, me.as_user(), &invocation).with_lookup(users);
        let ctx = match Next::new(self.middleware.clone()).run(ctx).await {
            Ok(ctx) => ctx,
            Err(MiddlewareError::Blocked(reason)) => {
                tracing::debug!("Ignoring message: {}", reason);
                return Vec::new();
            }
        };

        let mut args = Args::new(invocation.args);
        let Some(resolved) = self.commands.resolve(&ctx.invoked_with, &mut args) else {
            return self.on_command_error(&ctx, CommandError::NotFound(ctx.invoked_with.clone()));
        };

        let mut ctx = ctx;
        ctx.command = Some(resolved.qualified_name.clone());

        match self.invoke(&ctx, &resolved, args).await {
            Ok(replies) => {
                tracing::debug!("Command '{}' completed", resolved.qualified_name);
                replies
            }
            Err(e) => self.on_command_error(&ctx, e),
        }
    }

    async fn invoke(&self, ctx: &Context, resolved: &ResolvedCommand, args: Args) -> Result<Vec<Reply>, CommandError> {
        if resolved.guild_only() && ctx.guild_id().is_none() {
            return Err(CommandError::GuildOnly);
        }
        if resolved.owner_only() && !self.service.is_owner(ctx.author().id) {
            return Err(CommandError::CheckFailure(format!("{} is owner only", resolved.qualified_name)));
        }

        let cog = match &resolved.owner {
            CommandOwner::Builtin => return Ok(self.run_builtin(ctx, resolved, args)),
            CommandOwner::Cog(cog) => cog.clone(),
        };

        if !cog.cog_check(ctx).await {
            return Err(CommandError::CheckFailure(format!("{} check failed", cog.name())));
        }

        // A panicking handler must not take the process down
        let owned = ctx.clone();
        let handle = tokio::spawn(async move { cog.invoke(&owned, args).await });
        match handle.await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(CommandError::ExecutionFailed("command handler panicked".to_string())),
            Err(e) => Err(CommandError::ExecutionFailed(e.to_string())),
        }
    }

    fn run_builtin(&self, ctx: &Context, resolved: &ResolvedCommand, mut args: Args) -> Vec<Reply> {
        match resolved.command.name.as_str() {
            HELP_COMMAND => {
                let path = args.rest();
                vec![Reply::Text(self.commands.get_help(path.as_deref(), &ctx.prefix))]
            }
            other => {
                tracing::warn!("No builtin handler for '{}'", other);
                Vec::new()
            }
        }
    }

    /// Decide what the user sees for a failed command
    pub fn on_command_error(&self, ctx: &Context, error: CommandError) -> Vec<Reply> {
        match error {
            CommandError::NotFound(_) => Vec::new(),
            CommandError::CheckFailure(reason) => {
                tracing::debug!("Check failed for {}: {}", ctx.author().id, reason);
                Vec::new()
            }
            CommandError::GuildOnly => Vec::new(),
            CommandError::BadArgument(Some(msg)) => vec![Reply::Text(msg)],
            CommandError::BadArgument(None) => {
                vec![Reply::Text(self.commands.get_help(Some(ctx.command_name()), &ctx.prefix))]
            }
            CommandError::NsfwChannelRequired => {
                vec![Reply::text("Please run this command in an nsfw channel")]
            }
            err @ (CommandError::Storage(_) | CommandError::ExecutionFailed(_)) => {
                tracing::error!(
                    command = ctx.command_name(),
                    guild_id = ?ctx.guild_id(),
                    channel_id = ctx.channel_id(),
                    author_id = ctx.author().id,
                    "Error in command '{}': {}",
                    ctx.command_name(),
                    err
                );
                vec![Reply::text(COMMAND_ERRORED)]
            }
        }
    }
}

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::messaging::{Args, Context, Reply};
use crate::application::services::BotService;
use crate::domain::entities::Command;
use super::{Cog, CommandResult};

/// General commands
pub struct GeneralCog {
    service: Arc<BotService>,
}

impl GeneralCog {
    pub fn new(service: Arc<BotService>) -> Self {
        Self { service }
    }

    async fn show_prefix(&self, ctx: &Context) -> CommandResult {
        let prefixes = self.service.get_prefixes(ctx.guild_id(), ctx.me.id).await;
        Ok(vec![Reply::Text(format!("{:?}", prefixes))])
    }

    async fn prefix_set(&self, ctx: &Context, mut args: Args) -> CommandResult {
        let guild_id = ctx.guild_id().ok_or(CommandError::GuildOnly)?;

        let mut prefixes = Vec::new();
        while let Some(prefix) = args.next_word() {
            prefixes.push(prefix);
        }
        if prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(CommandError::usage());
        }

        self.service.prefix_manager().update_prefixes(guild_id, prefixes).await?;
        Ok(vec![Reply::tick()])
    }

    async fn prefix_reset(&self, ctx: &Context) -> CommandResult {
        let guild_id = ctx.guild_id().ok_or(CommandError::GuildOnly)?;
        self.service.prefix_manager().reset_prefixes(guild_id).await?;
        Ok(vec![Reply::tick()])
    }
}

#[async_trait]
impl Cog for GeneralCog {
    fn name(&self) -> &str {
        "General"
    }

    fn description(&self) -> &str {
        "General commands"
    }

    fn commands(&self) -> Vec<Command> {
        vec![
            Command::new("ping").with_description("Pong."),
            Command::new("show_prefix")
                .with_description("Show the prefixes accepted here")
                .owner_only(),
            Command::new("shutdown")
                .with_description("Shut the bot down")
                .owner_only(),
            Command::new("prefix")
                .with_description("Manage this server's prefixes")
                .owner_only()
                .guild_only()
                .with_subcommand(
                    Command::new("set")
                        .with_description("Replace this server's prefixes")
                        .with_usage("<prefixes...>"),
                )
                .with_subcommand(Command::new("reset").with_description("Go back to the default prefixes")),
        ]
    }

    async fn invoke(&self, ctx: &Context, args: Args) -> CommandResult {
        match ctx.command_name() {
            "ping" => Ok(vec![Reply::text("Pong.")]),
            "show_prefix" => self.show_prefix(ctx).await,
            "shutdown" => Ok(vec![Reply::text("Okay, I'm shutting down"), Reply::Shutdown]),
            "prefix set" => self.prefix_set(ctx, args).await,
            "prefix reset" => self.prefix_reset(ctx).await,
            "prefix" => Err(CommandError::usage()),
            other => Err(CommandError::NotFound(other.to_string())),
        }
    }
}

use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::messaging::{Args, Context, Reply};
use crate::application::pagination::Paginator;
use crate::application::services::{BotService, TagManager};
use crate::domain::entities::Command;
use super::{Cog, CommandResult};

/// Names taken by the tag group's subcommands
pub const SUBCOMMANDS: [&str; 3] = ["create", "delete", "list"];

/// Guild-scoped text snippets
pub struct TagsCog {
    tags: TagManager,
    service: Arc<BotService>,
}

impl TagsCog {
    pub fn new(tags: TagManager, service: Arc<BotService>) -> Self {
        Self { tags, service }
    }

    async fn show(&self, guild_id: u64, mut args: Args) -> CommandResult {
        let name = args.next_word().ok_or_else(CommandError::usage)?;
        match self.tags.get_tag(&name, guild_id).await? {
            Some(tag) => Ok(vec![Reply::Text(tag.response)]),
            // Most likely a misspelled subcommand
            None => Err(CommandError::usage()),
        }
    }

    async fn create(&self, ctx: &Context, guild_id: u64, mut args: Args) -> CommandResult {
        let name = args
            .next_word()
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(CommandError::usage)?;
        let response = args.rest().ok_or_else(CommandError::usage)?;

        self.tags
            .create_tag(&name, guild_id, ctx.author().id, &response)
            .await?;
        Ok(vec![Reply::tick()])
    }

    async fn delete(&self, ctx: &Context, guild_id: u64, mut args: Args) -> CommandResult {
        let name = args.next_word().ok_or_else(CommandError::usage)?;
        let author_id = ctx.author().id;

        self.tags
            .delete_tag(&name, guild_id, author_id, self.service.is_owner(author_id))
            .await?;
        Ok(vec![Reply::tick()])
    }

    async fn list(&self, ctx: &Context, guild_id: u64) -> CommandResult {
        let tags = self.tags.list_tags(guild_id).await?;
        if tags.is_empty() {
            return Ok(vec![Reply::text("There are no tags in this server")]);
        }

        let text = tags
            .iter()
            .map(|t| format!("\t- {}", t.name))
            .collect::<Vec<_>>()
            .join("\n");
        let page_length = self.service.config().pagination.page_length;
        Ok(vec![Reply::Pages(Paginator::from_text(
            "Tags",
            &format!("Tags:\n{}", text),
            page_length,
            ctx.author().id,
        ))])
    }
}

#[async_trait]
impl Cog for TagsCog {
    fn name(&self) -> &str {
        "Tags"
    }

    fn description(&self) -> &str {
        "Server tags"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("tag")
            .with_description("Show a tag")
            .with_usage("<name>")
            .guild_only()
            .with_subcommand(
                Command::new("create")
                    .with_description("Create a tag")
                    .with_usage("<name> <response>"),
            )
            .with_subcommand(
                Command::new("delete")
                    .with_description("Delete one of your tags")
                    .with_usage("<name>"),
            )
            .with_subcommand(Command::new("list").with_description("List this server's tags"))]
    }

    async fn invoke(&self, ctx: &Context, args: Args) -> CommandResult {
        let guild_id = ctx.guild_id().ok_or(CommandError::GuildOnly)?;
        match ctx.command_name() {
            "tag" => self.show(guild_id, args).await,
            "tag create" => self.create(ctx, guild_id, args).await,
            "tag delete" => self.delete(ctx, guild_id, args).await,
            "tag list" => self.list(ctx, guild_id).await,
            other => Err(CommandError::NotFound(other.to_string())),
        }
    }
}

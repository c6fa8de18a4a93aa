use async_trait::async_trait;
use std::sync::Arc;

use crate::application::errors::CommandError;
use crate::application::messaging::{Args, Context, Reply};
use crate::application::pagination::Paginator;
use crate::application::services::BotService;
use crate::domain::entities::{Command, User};
use super::{Cog, CommandResult};

/// Owner-only management of the global user blacklist
pub struct BlacklistCog {
    service: Arc<BotService>,
}

/// Replies for users that cannot be (un)blacklisted
struct Refusals {
    me: &'static str,
    bot: &'static str,
    owner: &'static str,
}

const ADD_REFUSALS: Refusals = Refusals {
    me: "Oh, I see how it is",
    bot: "That user is a bot",
    owner: "If you don't wanna talk to me just don't talk to me",
};

const REMOVE_REFUSALS: Refusals = Refusals {
    me: "Bruh",
    bot: "That user is a bot",
    owner: "*angery noises*",
};

impl BlacklistCog {
    pub fn new(service: Arc<BotService>) -> Self {
        Self { service }
    }

    /// First refusal that applies to any of `users`, in argument order
    fn refusal(&self, ctx: &Context, users: &[User], refusals: &Refusals) -> Option<&'static str> {
        users.iter().find_map(|user| {
            if user.id == ctx.me.id {
                Some(refusals.me)
            } else if user.is_bot {
                Some(refusals.bot)
            } else if self.service.is_owner(user.id) {
                Some(refusals.owner)
            } else {
                None
            }
        })
    }

    async fn add(&self, ctx: &Context, mut args: Args) -> CommandResult {
        let users = ctx.users(&mut args).await?;
        if users.is_empty() {
            return Err(CommandError::usage());
        }
        if let Some(refusal) = self.refusal(ctx, &users, &ADD_REFUSALS) {
            return Ok(vec![Reply::text(refusal)]);
        }

        let ids: Vec<u64> = users.iter().map(|u| u.id).collect();
        let reason = args.rest();
        self.service
            .blacklist_manager()
            .add_to_blacklist(&ids, reason.as_deref())
            .await?;
        Ok(vec![Reply::tick()])
    }

    async fn remove(&self, ctx: &Context, mut args: Args) -> CommandResult {
        let users = ctx.users(&mut args).await?;
        if users.is_empty() || !args.is_empty() {
            return Err(CommandError::usage());
        }
        if let Some(refusal) = self.refusal(ctx, &users, &REMOVE_REFUSALS) {
            return Ok(vec![Reply::text(refusal)]);
        }

        let ids: Vec<u64> = users.iter().map(|u| u.id).collect();
        self.service.blacklist_manager().remove_from_blacklist(&ids).await?;
        Ok(vec![Reply::tick()])
    }

    async fn list(&self, ctx: &Context) -> CommandResult {
        let blacklist = self.service.blacklist_manager().get_blacklist().await?;
        if blacklist.is_empty() {
            return Ok(vec![Reply::text("There are no blacklisted users")]);
        }

        let mut text = "Blacklisted Users:\n".to_string();
        text.push_str(
            &blacklist
                .iter()
                .map(|(id, reason)| format!("\t- {}: {}", id, reason))
                .collect::<Vec<_>>()
                .join("\n"),
        );
        let page_length = self.service.config().pagination.page_length;
        Ok(vec![Reply::Pages(Paginator::from_text(
            "Blacklist",
            &text,
            page_length,
            ctx.author().id,
        ))])
    }
}

#[async_trait]
impl Cog for BlacklistCog {
    fn name(&self) -> &str {
        "Blacklist"
    }

    fn description(&self) -> &str {
        "Keep users from talking to the bot"
    }

    fn commands(&self) -> Vec<Command> {
        vec![Command::new("blacklist")
            .with_description("Manage the blacklist")
            .with_subcommand(
                Command::new("add")
                    .with_description("Blacklist users")
                    .with_usage("<users...> [reason]"),
            )
            .with_subcommand(
                Command::new("remove")
                    .with_description("Remove users from the blacklist")
                    .with_usage("<users...>"),
            )
            .with_subcommand(Command::new("list").with_description("Show blacklisted users"))]
    }

    async fn cog_check(&self, ctx: &Context) -> bool {
        self.service.is_owner(ctx.author().id)
    }

    async fn invoke(&self, ctx: &Context, args: Args) -> CommandResult {
        match ctx.command_name() {
            "blacklist" => Err(CommandError::usage()),
            "blacklist add" => self.add(ctx, args).await,
            "blacklist remove" => self.remove(ctx, args).await,
            "blacklist list" => self.list(ctx).await,
            other => Err(CommandError::NotFound(other.to_string())),
        }
    }
}

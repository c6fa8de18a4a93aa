//! Cogs - groups of related commands
//!
//! A cog declares its commands up front and receives every invocation of
//! them through [`Cog::invoke`], with the resolved (qualified) command name
//! available from the context.

use async_trait::async_trait;

use crate::application::errors::CommandError;
use crate::application::messaging::{Args, Context, Reply};
use crate::domain::entities::Command;

pub mod blacklist;
pub mod general;
pub mod tags;

pub use blacklist::BlacklistCog;
pub use general::GeneralCog;
pub use tags::TagsCog;

pub type CommandResult = Result<Vec<Reply>, CommandError>;

#[async_trait]
pub trait Cog: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Top-level commands (with their subcommands) this cog handles
    fn commands(&self) -> Vec<Command>;

    /// Runs before any of this cog's commands; `false` fails the check silently
    async fn cog_check(&self, _ctx: &Context) -> bool {
        true
    }

    async fn invoke(&self, ctx: &Context, args: Args) -> CommandResult;
}

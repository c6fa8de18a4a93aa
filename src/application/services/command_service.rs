use std::collections::HashMap;
use std::sync::Arc;

use crate::application::errors::BotError;
use crate::application::messaging::parser::Args;
use crate::cogs::Cog;
use crate::domain::entities::{Command, CommandRegistry};

pub const HELP_COMMAND: &str = "help";

/// Who runs a registered command
#[derive(Clone)]
pub enum CommandOwner {
    /// Handled by the dispatcher itself
    Builtin,
    Cog(Arc<dyn Cog>),
}

/// A command resolved from an invocation, subcommand included
#[derive(Clone)]
pub struct ResolvedCommand {
    pub owner: CommandOwner,
    pub command: Command,
    pub subcommand: Option<Command>,
    pub qualified_name: String,
}

impl ResolvedCommand {
    pub fn owner_only(&self) -> bool {
        self.command.owner_only || self.subcommand.as_ref().map_or(false, |s| s.owner_only)
    }

    pub fn guild_only(&self) -> bool {
        self.command.guild_only || self.subcommand.as_ref().map_or(false, |s| s.guild_only)
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self.owner, CommandOwner::Builtin)
    }
}

/// Service for registering cogs and looking up their commands
pub struct CommandService {
    registry: CommandRegistry,
    owners: HashMap<String, CommandOwner>,
    cogs: Vec<Arc<dyn Cog>>,
}

impl CommandService {
    pub fn new() -> Self {
        let mut service = Self {
            registry: CommandRegistry::new(),
            owners: HashMap::new(),
            cogs: Vec::new(),
        };
        service.registry.register(
            Command::new(HELP_COMMAND)
                .with_description("Show help for a command")
                .with_usage("[command]"),
        );
        service.owners.insert(HELP_COMMAND.to_string(), CommandOwner::Builtin);
        service
    }

    /// Register every command a cog provides
    pub fn add_cog(&mut self, cog: Arc<dyn Cog>) -> Result<(), BotError> {
        if self.cogs.iter().any(|c| c.name() == cog.name()) {
            return Err(BotError::Internal(format!("Cog '{}' already registered", cog.name())));
        }

        let commands = cog.commands();
        for command in &commands {
            if self.registry.find(&command.name).is_some()
                || command.aliases.iter().any(|a| self.registry.find(a).is_some())
            {
                return Err(BotError::Internal(format!(
                    "Command '{}' from cog '{}' is already registered",
                    command.name,
                    cog.name()
                )));
            }
        }

        for command in commands {
            self.owners.insert(command.name.clone(), CommandOwner::Cog(cog.clone()));
            self.registry.register(command);
        }
        tracing::info!("Registered cog: {}", cog.name());
        self.cogs.push(cog);
        Ok(())
    }

    pub fn cogs(&self) -> &[Arc<dyn Cog>] {
        &self.cogs
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    /// Resolve `name` plus, when it names a group, a subcommand taken from `args`
    pub fn resolve(&self, name: &str, args: &mut Args) -> Option<ResolvedCommand> {
        let command = self.registry.find(name)?;
        let owner = self.owners.get(&command.name)?.clone();

        let subcommand = args
            .peek_word()
            .and_then(|word| command.find_subcommand(&word).cloned());
        if subcommand.is_some() {
            args.next_word();
        }

        let qualified_name = match &subcommand {
            Some(sub) => format!("{} {}", command.name, sub.name),
            None => command.name.clone(),
        };

        Some(ResolvedCommand {
            owner,
            command: command.clone(),
            subcommand,
            qualified_name,
        })
    }

    /// Help for one command (`"tag"`, `"tag create"`) or the command list
    pub fn get_help(&self, path: Option<&str>, prefix: &str) -> String {
        let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
            let mut help = "Available commands:\n".to_string();
            for cmd in self.registry.all() {
                help.push_str(&format!(
                    "  {}{} - {}\n",
                    prefix,
                    cmd.name,
                    cmd.description.as_deref().unwrap_or("")
                ));
            }
            return help.trim_end().to_string();
        };

        let mut words = path.split_whitespace();
        let Some(cmd) = words.next().and_then(|w| self.registry.find(w)) else {
            return format!("Command {}{} not found", prefix, path);
        };

        let (target, qualified) = match words.next().and_then(|w| cmd.find_subcommand(w)) {
            Some(sub) => (sub, format!("{} {}", cmd.name, sub.name)),
            None => (cmd, cmd.name.clone()),
        };

        let mut help = format!("{}{}", prefix, qualified);
        if let Some(usage) = &target.usage {
            help.push(' ');
            help.push_str(usage);
        }
        if let Some(description) = &target.description {
            help.push_str(&format!("\n{}", description));
        }
        if !target.subcommands.is_empty() {
            help.push_str("\n\nSubcommands:");
            for sub in &target.subcommands {
                help.push_str(&format!(
                    "\n  {}{} {} - {}",
                    prefix,
                    qualified,
                    sub.name,
                    sub.description.as_deref().unwrap_or("")
                ));
            }
        }
        help
    }
}

impl Default for CommandService {
    fn default() -> Self {
        Self::new()
    }
}

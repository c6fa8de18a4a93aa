//! Application layer errors

use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Command execution errors.
///
/// This is the closed set of failure kinds the dispatcher switches on when it
/// decides what (if anything) the invoking user gets to see.
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Check failed: {0}")]
    CheckFailure(String),

    #[error("Command can only be used in a guild")]
    GuildOnly,

    #[error("Invalid arguments: {}", .0.as_deref().unwrap_or("see usage"))]
    BadArgument(Option<String>),

    #[error("NSFW channel required")]
    NsfwChannelRequired,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl CommandError {
    /// Bad argument with a message shown verbatim to the user
    pub fn bad_argument(msg: impl Into<String>) -> Self {
        CommandError::BadArgument(Some(msg.into()))
    }

    /// Bad argument that should be answered with the command's help
    pub fn usage() -> Self {
        CommandError::BadArgument(None)
    }
}

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store '{0}' is closed")]
    Closed(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Tag operation errors. The messages are shown to users as-is.
#[derive(Error, Debug)]
pub enum TagError {
    #[error("That tag name is reserved (probably for subcommands)")]
    Reserved,

    #[error("That tag already exists.")]
    AlreadyExists,

    #[error("I could not find that tag.")]
    NotFound,

    #[error("You are not the author of that tag")]
    NotAuthor,

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<TagError> for CommandError {
    fn from(err: TagError) -> Self {
        match err {
            TagError::Storage(e) => CommandError::Storage(e),
            other => CommandError::bad_argument(other.to_string()),
        }
    }
}

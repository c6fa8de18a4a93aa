//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use crate::application::errors::ConfigError;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub discord: DiscordConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
    /// Prefixes used in guilds without a stored prefix set, and in DMs
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub owners: Vec<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiscordConfig {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct StorageConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PaginationConfig {
    pub page_length: usize,
    pub timeout_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("data"),
        }
    }
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            page_length: 300,
            timeout_seconds: 180,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "cogbot".to_string(),
                prefixes: vec!["!".to_string()],
                owners: Vec::new(),
            },
            discord: DiscordConfig::default(),
            storage: StorageConfig::default(),
            pagination: PaginationConfig::default(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self)
            .map_err(|e| ConfigError::Parse(format!("Failed to serialize config: {}", e)))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.bot.prefixes.iter().all(|p| p.trim().is_empty()) {
            return Err(ConfigError::MissingField("bot.prefixes".to_string()));
        }
        if self.pagination.page_length == 0 {
            return Err(ConfigError::InvalidValue("pagination.page-length must be positive".to_string()));
        }
        Ok(())
    }

    /// Check if a user ID is a configured owner
    pub fn is_owner(&self, user_id: u64) -> bool {
        self.bot.owners.contains(&user_id)
    }

    pub fn load_env() -> Self {
        // Load from environment variables
        let mut config = Config::default();

        if let Ok(token) = std::env::var("DISCORD_TOKEN") {
            config.discord.token = Some(token);
        }

        if let Ok(prefix) = std::env::var("BOT_PREFIX") {
            if !prefix.trim().is_empty() {
                config.bot.prefixes = vec![prefix];
            }
        }

        if let Ok(owners) = std::env::var("BOT_OWNERS") {
            config.bot.owners = owners
                .split(',')
                .filter_map(|id| match id.trim().parse() {
                    Ok(id) => Some(id),
                    Err(_) => {
                        tracing::warn!("Ignoring invalid owner id in BOT_OWNERS: {:?}", id);
                        None
                    }
                })
                .collect();
        }

        if let Ok(dir) = std::env::var("COGBOT_DATA_DIR") {
            config.storage.directory = PathBuf::from(dir);
        }

        config
    }
}

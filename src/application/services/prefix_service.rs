use std::sync::Arc;

use crate::application::errors::StorageError;
use crate::domain::traits::KeyedStore;

/// Per-guild prefix sets with a global default
pub struct PrefixManager {
    store: Arc<dyn KeyedStore<u64, Vec<String>>>,
    default: Vec<String>,
}

impl PrefixManager {
    pub fn new(store: Arc<dyn KeyedStore<u64, Vec<String>>>, default: Vec<String>) -> Self {
        Self { store, default }
    }

    /// Stored prefixes for the guild, else the default list.
    ///
    /// A store failure is logged and answered with the default so commands
    /// keep working.
    pub async fn resolve_prefixes(&self, guild_id: Option<u64>) -> Vec<String> {
        let Some(guild_id) = guild_id else {
            return self.default.clone();
        };

        match self.store.get(&guild_id).await {
            Ok(Some(prefixes)) if !prefixes.is_empty() => prefixes,
            Ok(_) => self.default.clone(),
            Err(e) => {
                tracing::warn!("Could not load prefixes for guild {}: {}", guild_id, e);
                self.default.clone()
            }
        }
    }

    pub async fn get_prefixes(&self, guild_id: u64) -> Result<Option<Vec<String>>, StorageError> {
        self.store.get(&guild_id).await
    }

    /// Replace the guild's prefix set. Blank prefixes and duplicates are dropped.
    ///
    /// Returns the stored list; an all-blank input clears the set instead.
    pub async fn update_prefixes(&self, guild_id: u64, prefixes: Vec<String>) -> Result<Vec<String>, StorageError> {
        let mut cleaned: Vec<String> = Vec::with_capacity(prefixes.len());
        for prefix in prefixes {
            if !prefix.trim().is_empty() && !cleaned.contains(&prefix) {
                cleaned.push(prefix);
            }
        }

        if cleaned.is_empty() {
            self.reset_prefixes(guild_id).await?;
        } else {
            self.store.put(&guild_id, &cleaned).await?;
            tracing::info!("Updated prefixes for guild {}: {:?}", guild_id, cleaned);
        }
        Ok(cleaned)
    }

    pub async fn reset_prefixes(&self, guild_id: u64) -> Result<(), StorageError> {
        self.store.delete(&guild_id).await?;
        tracing::info!("Reset prefixes for guild {}", guild_id);
        Ok(())
    }
}

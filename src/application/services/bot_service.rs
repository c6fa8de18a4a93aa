use std::collections::HashSet;
use std::sync::RwLock;

use tokio::sync::watch;

use crate::infrastructure::config::Config;
use super::blacklist_service::BlacklistManager;
use super::prefix_service::PrefixManager;

/// Bot façade: prefix resolution, the blacklist filter, owners and shutdown
pub struct BotService {
    config: Config,
    prefixes: PrefixManager,
    blacklist: BlacklistManager,
    owners: RwLock<HashSet<u64>>,
    shutdown: watch::Sender<bool>,
}

impl BotService {
    pub fn new(config: Config, prefixes: PrefixManager, blacklist: BlacklistManager) -> Self {
        let owners = config.bot.owners.iter().copied().collect();
        let (shutdown, _) = watch::channel(false);
        Self {
            config,
            prefixes,
            blacklist,
            owners: RwLock::new(owners),
            shutdown,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn prefix_manager(&self) -> &PrefixManager {
        &self.prefixes
    }

    pub fn blacklist_manager(&self) -> &BlacklistManager {
        &self.blacklist
    }

    /// Text prefixes in effect for a guild (or the default outside guilds)
    pub async fn resolve_prefixes(&self, guild_id: Option<u64>) -> Vec<String> {
        self.prefixes.resolve_prefixes(guild_id).await
    }

    /// Every prefix a message may start with, mention forms of `me_id` included
    pub async fn get_prefixes(&self, guild_id: Option<u64>, me_id: u64) -> Vec<String> {
        let mut prefixes = self.resolve_prefixes(guild_id).await;
        prefixes.push(format!("<@{}> ", me_id));
        prefixes.push(format!("<@!{}> ", me_id));
        prefixes
    }

    /// Whether messages from `user_id` must be dropped.
    ///
    /// Lookup failures are logged and let the message through.
    pub async fn is_blocked(&self, user_id: u64) -> bool {
        match self.blacklist.is_blocked(user_id).await {
            Ok(blocked) => blocked,
            Err(e) => {
                tracing::error!("Blacklist lookup for {} failed: {}", user_id, e);
                false
            }
        }
    }

    pub fn is_owner(&self, user_id: u64) -> bool {
        match self.owners.read() {
            Ok(owners) => owners.contains(&user_id),
            Err(poisoned) => poisoned.into_inner().contains(&user_id),
        }
    }

    /// Register an owner discovered at runtime (the application owner)
    pub fn add_owner(&self, user_id: u64) {
        let mut owners = match self.owners.write() {
            Ok(owners) => owners,
            Err(poisoned) => poisoned.into_inner(),
        };
        if owners.insert(user_id) {
            tracing::info!("Added owner {}", user_id);
        }
    }

    pub fn owners(&self) -> Vec<u64> {
        let owners = match self.owners.read() {
            Ok(owners) => owners,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut owners: Vec<u64> = owners.iter().copied().collect();
        owners.sort_unstable();
        owners
    }

    pub fn request_shutdown(&self) {
        if !self.shutdown.send_replace(true) {
            tracing::info!("Shutdown requested");
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Receiver that flips to `true` once shutdown is requested
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use crate::infrastructure::database::{BlacklistTable, PrefixTable};
    use crate::infrastructure::storage::SqliteStore;

    fn service(owners: Vec<u64>) -> BotService {
        let mut config = Config::default();
        config.bot.owners = owners;
        let prefixes = PrefixManager::new(
            Arc::new(SqliteStore::<PrefixTable>::in_memory().unwrap()),
            config.bot.prefixes.clone(),
        );
        let blacklist = BlacklistManager::new(Arc::new(SqliteStore::<BlacklistTable>::in_memory().unwrap()));
        BotService::new(config, prefixes, blacklist)
    }

    #[tokio::test]
    async fn test_prefixes_include_mentions() {
        let service = service(Vec::new());
        assert_eq!(
            service.get_prefixes(Some(1), 42).await,
            vec!["!", "<@42> ", "<@!42> "]
        );

        service.prefix_manager().update_prefixes(1, vec!["?".to_string()]).await.unwrap();
        assert_eq!(service.get_prefixes(Some(1), 42).await[0], "?");
        assert_eq!(service.get_prefixes(None, 42).await[0], "!");
    }

    #[tokio::test]
    async fn test_blocked_users() {
        let service = service(Vec::new());
        assert!(!service.is_blocked(7).await);
        service.blacklist_manager().add_to_blacklist(&[7], Some("x")).await.unwrap();
        assert!(service.is_blocked(7).await);
    }

    #[test]
    fn test_owners() {
        let service = service(vec![1]);
        assert!(service.is_owner(1));
        assert!(!service.is_owner(2));
        service.add_owner(2);
        assert!(service.is_owner(2));
        assert_eq!(service.owners(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_shutdown_signal() {
        let service = service(Vec::new());
        let mut signal = service.shutdown_signal();
        assert!(!service.is_shutting_down());

        service.request_shutdown();
        signal.changed().await.unwrap();
        assert!(*signal.borrow());
        assert!(service.is_shutting_down());

        // Requesting twice is harmless
        service.request_shutdown();
    }
}

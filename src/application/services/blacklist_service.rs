use std::collections::BTreeMap;
use std::sync::Arc;

use crate::application::errors::StorageError;
use crate::domain::traits::KeyedStore;

pub const DEFAULT_REASON: &str = "No reason provided";

/// Global user blacklist
pub struct BlacklistManager {
    store: Arc<dyn KeyedStore<u64, String>>,
}

impl BlacklistManager {
    pub fn new(store: Arc<dyn KeyedStore<u64, String>>) -> Self {
        Self { store }
    }

    pub async fn is_blocked(&self, user_id: u64) -> Result<bool, StorageError> {
        Ok(self.store.get(&user_id).await?.is_some())
    }

    pub async fn reason(&self, user_id: u64) -> Result<Option<String>, StorageError> {
        self.store.get(&user_id).await
    }

    /// Blacklist every user with the same reason; re-adding updates the reason
    pub async fn add_to_blacklist(&self, users: &[u64], reason: Option<&str>) -> Result<(), StorageError> {
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_REASON)
            .to_string();

        for user_id in users {
            self.store.put(user_id, &reason).await?;
        }
        tracing::info!("Blacklisted {:?}: {}", users, reason);
        Ok(())
    }

    pub async fn remove_from_blacklist(&self, users: &[u64]) -> Result<(), StorageError> {
        for user_id in users {
            self.store.delete(user_id).await?;
        }
        tracing::info!("Removed {:?} from the blacklist", users);
        Ok(())
    }

    /// Every entry, ordered by user id
    pub async fn get_blacklist(&self) -> Result<BTreeMap<u64, String>, StorageError> {
        Ok(self.store.entries().await?.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::database::BlacklistTable;
    use crate::infrastructure::storage::SqliteStore;

    fn manager() -> BlacklistManager {
        BlacklistManager::new(Arc::new(SqliteStore::<BlacklistTable>::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let manager = manager();
        manager.add_to_blacklist(&[7], Some("x")).await.unwrap();
        assert!(manager.is_blocked(7).await.unwrap());
        assert_eq!(manager.reason(7).await.unwrap().as_deref(), Some("x"));

        manager.remove_from_blacklist(&[7]).await.unwrap();
        assert!(!manager.is_blocked(7).await.unwrap());
        assert!(!manager.get_blacklist().await.unwrap().contains_key(&7));
    }

    #[tokio::test]
    async fn test_default_reason() {
        let manager = manager();
        manager.add_to_blacklist(&[1, 2], None).await.unwrap();
        manager.add_to_blacklist(&[3], Some("   ")).await.unwrap();

        let list = manager.get_blacklist().await.unwrap();
        assert_eq!(list.len(), 3);
        assert!(list.values().all(|r| r == DEFAULT_REASON));
        assert_eq!(list.keys().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_remove_unknown_user_is_noop() {
        let manager = manager();
        manager.add_to_blacklist(&[1], Some("spam")).await.unwrap();
        manager.remove_from_blacklist(&[99]).await.unwrap();
        assert_eq!(manager.get_blacklist().await.unwrap().len(), 1);
    }
}

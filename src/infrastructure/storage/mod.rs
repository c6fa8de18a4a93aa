//! SQLite-backed keyed store with an in-memory read cache

use async_trait::async_trait;
use rusqlite::Connection;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use crate::application::errors::StorageError;
use crate::domain::traits::{KeyedStore, Removal};
use crate::infrastructure::database::{self, BlacklistTable, PrefixTable, Table, TagTable};

/// Cache-backed CRUD store over a single table.
///
/// The connection lock is held for every mutation and every cache fill, so
/// a completed call never leaves cache and table disagreeing and writers are
/// serialized.
pub struct SqliteStore<T: Table> {
    conn: Mutex<Option<Connection>>,
    cache: RwLock<HashMap<T::Key, T::Value>>,
    _table: PhantomData<fn() -> T>,
}

impl<T: Table> SqliteStore<T> {
    /// Open the store at `path`, falling back to an empty in-memory table
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Ok(Self::from_connection(database::open_or_memory::<T>(path)?))
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self::from_connection(database::open_memory::<T>()?))
    }

    fn from_connection(conn: Connection) -> Self {
        let cache = match T::select_all(&conn) {
            Ok(rows) => rows.into_iter().collect(),
            Err(e) => {
                tracing::error!("Could not warm {} cache: {}", T::NAME, e);
                HashMap::new()
            }
        };
        tracing::debug!("Opened {} store with {} cached rows", T::NAME, cache.len());

        Self {
            conn: Mutex::new(Some(conn)),
            cache: RwLock::new(cache),
            _table: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        T::NAME
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Close the connection. Later calls fail with `StorageError::Closed`.
    pub async fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.conn.lock().await;
        self.cache.write().await.clear();
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| StorageError::Sqlite(e))?;
            tracing::info!("Closed {} store", T::NAME);
        }
        Ok(())
    }

    fn closed() -> StorageError {
        StorageError::Closed(T::NAME.to_string())
    }
}

fn in_transaction<R>(
    conn: &mut Connection,
    f: impl FnOnce(&Connection) -> Result<R, StorageError>,
) -> Result<R, StorageError> {
    let tx = conn.transaction()?;
    let result = f(&*tx)?;
    tx.commit()?;
    Ok(result)
}

#[async_trait]
impl<T: Table> KeyedStore<T::Key, T::Value> for SqliteStore<T> {
    async fn get(&self, key: &T::Key) -> Result<Option<T::Value>, StorageError> {
        if let Some(value) = self.cache.read().await.get(key) {
            return Ok(Some(value.clone()));
        }

        let guard = self.conn.lock().await;
        let value = T::select(guard.as_ref().ok_or_else(Self::closed)?, key)?;
        if let Some(ref value) = value {
            self.cache.write().await.insert(key.clone(), value.clone());
            tracing::debug!("{} cache filled for {:?}", T::NAME, key);
        }
        Ok(value)
    }

    async fn put(&self, key: &T::Key, value: &T::Value) -> Result<(), StorageError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(Self::closed)?;
        in_transaction(conn, |tx| T::upsert(tx, key, value))?;
        self.cache.write().await.insert(key.clone(), value.clone());
        Ok(())
    }

    async fn insert_new(&self, key: &T::Key, value: &T::Value) -> Result<bool, StorageError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(Self::closed)?;
        let inserted = in_transaction(conn, |tx| T::insert(tx, key, value))?;
        if inserted {
            self.cache.write().await.insert(key.clone(), value.clone());
        }
        Ok(inserted)
    }

    async fn delete(&self, key: &T::Key) -> Result<(), StorageError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(Self::closed)?;
        let removed = in_transaction(conn, |tx| T::delete(tx, key))?;
        self.cache.write().await.remove(key);
        drop(guard);
        if removed == 0 {
            tracing::debug!("{} delete of missing key {:?}", T::NAME, key);
        }
        Ok(())
    }

    async fn remove_if(
        &self,
        key: &T::Key,
        condition: &(dyn for<'v> Fn(&'v T::Value) -> bool + Send + Sync),
    ) -> Result<Removal<T::Value>, StorageError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or_else(Self::closed)?;
        let removal = in_transaction(conn, |tx| match T::select(tx, key)? {
            None => Ok(Removal::Missing),
            Some(value) if condition(&value) => {
                T::delete(tx, key)?;
                Ok(Removal::Removed(value))
            }
            Some(value) => Ok(Removal::Kept(value)),
        })?;

        let mut cache = self.cache.write().await;
        match removal {
            Removal::Kept(ref value) => {
                cache.insert(key.clone(), value.clone());
            }
            _ => {
                cache.remove(key);
            }
        }
        Ok(removal)
    }

    async fn entries(&self) -> Result<Vec<(T::Key, T::Value)>, StorageError> {
        let guard = self.conn.lock().await;
        let rows = T::select_all(guard.as_ref().ok_or_else(Self::closed)?)?;
        *self.cache.write().await = rows.iter().cloned().collect();
        Ok(rows)
    }
}

/// The bot's three stores, one SQLite file each
pub struct Stores {
    pub prefixes: Arc<SqliteStore<PrefixTable>>,
    pub blacklist: Arc<SqliteStore<BlacklistTable>>,
    pub tags: Arc<SqliteStore<TagTable>>,
}

impl Stores {
    /// Open `prefixes.db`, `blacklist.db` and `tags.db` under `dir`
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref();
        Ok(Self {
            prefixes: Arc::new(SqliteStore::open(dir.join("prefixes.db"))?),
            blacklist: Arc::new(SqliteStore::open(dir.join("blacklist.db"))?),
            tags: Arc::new(SqliteStore::open(dir.join("tags.db"))?),
        })
    }

    pub fn in_memory() -> Result<Self, StorageError> {
        Ok(Self {
            prefixes: Arc::new(SqliteStore::in_memory()?),
            blacklist: Arc::new(SqliteStore::in_memory()?),
            tags: Arc::new(SqliteStore::in_memory()?),
        })
    }

    /// Close every store, reporting the first failure after trying all of them
    pub async fn close_all(&self) -> Result<(), StorageError> {
        let results = [
            self.prefixes.close().await,
            self.blacklist.close().await,
            self.tags.close().await,
        ];
        results.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{TagKey, TagRecord};

    #[tokio::test]
    async fn test_get_fills_cache_from_table() {
        let store = SqliteStore::<BlacklistTable>::in_memory().unwrap();
        {
            let guard = store.conn.lock().await;
            BlacklistTable::upsert(guard.as_ref().unwrap(), &1, &"spam".to_string()).unwrap();
        }
        assert_eq!(store.cached_len().await, 0);
        assert_eq!(store.get(&1).await.unwrap().as_deref(), Some("spam"));
        assert_eq!(store.cached_len().await, 1);
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let store = SqliteStore::<PrefixTable>::in_memory().unwrap();
        assert_eq!(store.get(&10).await.unwrap(), None);

        store.put(&10, &vec!["?".to_string()]).await.unwrap();
        assert_eq!(store.get(&10).await.unwrap(), Some(vec!["?".to_string()]));

        store.put(&10, &vec!["!".to_string()]).await.unwrap();
        assert_eq!(store.get(&10).await.unwrap(), Some(vec!["!".to_string()]));
    }

    #[tokio::test]
    async fn test_delete_missing_key_is_noop() {
        let store = SqliteStore::<BlacklistTable>::in_memory().unwrap();
        store.put(&1, &"reason".to_string()).await.unwrap();

        store.delete(&2).await.unwrap();

        assert_eq!(store.entries().await.unwrap(), vec![(1, "reason".to_string())]);
        assert_eq!(store.get(&1).await.unwrap().as_deref(), Some("reason"));
    }

    #[tokio::test]
    async fn test_delete_evicts_cache() {
        let store = SqliteStore::<BlacklistTable>::in_memory().unwrap();
        store.put(&1, &"reason".to_string()).await.unwrap();
        assert_eq!(store.cached_len().await, 1);

        store.delete(&1).await.unwrap();
        assert_eq!(store.cached_len().await, 0);
        assert_eq!(store.get(&1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_remove_if_checks_current_row() {
        let store = SqliteStore::<TagTable>::in_memory().unwrap();
        let key = TagKey::new("foo", 1);
        let by = |author_id: u64| move |record: &TagRecord| record.author_id == author_id;

        assert_eq!(store.remove_if(&key, &by(2)).await.unwrap(), Removal::Missing);

        let record = TagRecord { author_id: 2, response: "bar".into() };
        store.insert_new(&key, &record).await.unwrap();

        assert_eq!(store.remove_if(&key, &by(3)).await.unwrap(), Removal::Kept(record.clone()));
        assert_eq!(store.get(&key).await.unwrap(), Some(record.clone()));

        assert_eq!(store.remove_if(&key, &by(2)).await.unwrap(), Removal::Removed(record));
        assert_eq!(store.get(&key).await.unwrap(), None);
        assert!(store.entries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_insert_new_has_one_winner() {
        let store = Arc::new(SqliteStore::<TagTable>::in_memory().unwrap());
        let key = TagKey::new("foo", 1);

        let mut handles = Vec::new();
        for author_id in 0..8u64 {
            let store = store.clone();
            let key = key.clone();
            handles.push(tokio::spawn(async move {
                let record = TagRecord { author_id, response: format!("from {}", author_id) };
                store.insert_new(&key, &record).await.unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(store.entries().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_store_rejects_calls() {
        let store = SqliteStore::<BlacklistTable>::in_memory().unwrap();
        store.close().await.unwrap();
        assert!(matches!(store.get(&1).await, Err(StorageError::Closed(_))));
        assert!(matches!(store.put(&1, &"x".to_string()).await, Err(StorageError::Closed(_))));
        // Closing twice is harmless
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_open_warms_cache_from_file() {
        let path = std::env::temp_dir().join(format!("cogbot-warm-{}.db", std::process::id()));
        let _ = std::fs::remove_file(&path);
        {
            let store = SqliteStore::<BlacklistTable>::open(&path).unwrap();
            store.put(&5, &"gone".to_string()).await.unwrap();
            store.close().await.unwrap();
        }

        let store = SqliteStore::<BlacklistTable>::open(&path).unwrap();
        assert_eq!(store.cached_len().await, 1);
        assert_eq!(store.get(&5).await.unwrap().as_deref(), Some("gone"));
        store.close().await.unwrap();
        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_close_all_closes_every_store() {
        let stores = Stores::in_memory().unwrap();
        stores.tags.insert_new(&TagKey::new("a", 1), &TagRecord { author_id: 1, response: "b".into() }).await.unwrap();
        stores.close_all().await.unwrap();

        assert!(matches!(stores.prefixes.get(&1).await, Err(StorageError::Closed(_))));
        assert!(matches!(stores.blacklist.entries().await, Err(StorageError::Closed(_))));
        assert!(matches!(stores.tags.entries().await, Err(StorageError::Closed(_))));
    }
}

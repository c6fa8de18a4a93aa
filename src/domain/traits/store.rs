use async_trait::async_trait;
use crate::application::errors::StorageError;

/// Keyed persistence - a cache-backed CRUD store over one table
///
/// Implementations must leave cache and table consistent once a call has
/// completed, and must serialize concurrent mutations.
#[async_trait]
pub trait KeyedStore<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    async fn get(&self, key: &K) -> Result<Option<V>, StorageError>;

    /// Insert or replace the row for `key`
    async fn put(&self, key: &K, value: &V) -> Result<(), StorageError>;

    /// Insert only if no row exists; returns whether the row was written
    async fn insert_new(&self, key: &K, value: &V) -> Result<bool, StorageError>;

    /// Remove the row for `key`. Missing keys are not an error.
    async fn delete(&self, key: &K) -> Result<(), StorageError>;

    /// Remove the row for `key` only if `condition` holds for its current
    /// value. The read and the delete are one step: no other mutation of the
    /// store can land between them.
    async fn remove_if(
        &self,
        key: &K,
        condition: &(dyn for<'v> Fn(&'v V) -> bool + Send + Sync),
    ) -> Result<Removal<V>, StorageError>;

    /// Every row, read from the backing table
    async fn entries(&self) -> Result<Vec<(K, V)>, StorageError>;
}

/// Outcome of [`KeyedStore::remove_if`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Removal<V> {
    /// No row for the key
    Missing,
    /// The condition did not hold; the row is untouched
    Kept(V),
    Removed(V),
}

use std::sync::Arc;

use crate::application::errors::{StorageError, TagError};
use crate::domain::entities::{normalize_tag_name, Tag, TagKey, TagRecord};
use crate::domain::traits::{KeyedStore, Removal};

/// Guild-scoped tags
pub struct TagManager {
    store: Arc<dyn KeyedStore<TagKey, TagRecord>>,
    reserved: Vec<String>,
}

impl TagManager {
    /// `reserved` names cannot be created as tags (the tag group's subcommands)
    pub fn new(store: Arc<dyn KeyedStore<TagKey, TagRecord>>, reserved: &[&str]) -> Self {
        Self {
            store,
            reserved: reserved.iter().map(|r| normalize_tag_name(r)).collect(),
        }
    }

    pub fn is_reserved(&self, name: &str) -> bool {
        self.reserved.contains(&normalize_tag_name(name))
    }

    pub async fn get_tag(&self, name: &str, guild_id: u64) -> Result<Option<Tag>, StorageError> {
        let key = TagKey::new(name, guild_id);
        Ok(self
            .store
            .get(&key)
            .await?
            .map(|record| Tag::from_parts(key, record)))
    }

    pub async fn create_tag(
        &self,
        name: &str,
        guild_id: u64,
        author_id: u64,
        response: &str,
    ) -> Result<Tag, TagError> {
        if self.is_reserved(name) {
            return Err(TagError::Reserved);
        }

        let key = TagKey::new(name, guild_id);
        let record = TagRecord {
            author_id,
            response: response.to_string(),
        };
        if !self.store.insert_new(&key, &record).await? {
            return Err(TagError::AlreadyExists);
        }

        tracing::info!("Tag '{}' created in guild {} by {}", key.name, guild_id, author_id);
        Ok(Tag::from_parts(key, record))
    }

    /// Delete a tag. Only its author may do so unless `is_owner` is set.
    ///
    /// The author check runs against the row being deleted, inside the
    /// store's removal step.
    pub async fn delete_tag(
        &self,
        name: &str,
        guild_id: u64,
        requester_id: u64,
        is_owner: bool,
    ) -> Result<Tag, TagError> {
        let key = TagKey::new(name, guild_id);
        let may_delete = |record: &TagRecord| is_owner || record.author_id == requester_id;

        match self.store.remove_if(&key, &may_delete).await? {
            Removal::Missing => Err(TagError::NotFound),
            Removal::Kept(_) => Err(TagError::NotAuthor),
            Removal::Removed(record) => {
                tracing::info!("Tag '{}' deleted in guild {} by {}", key.name, guild_id, requester_id);
                Ok(Tag::from_parts(key, record))
            }
        }
    }

    /// Tags of one guild, sorted by name
    pub async fn list_tags(&self, guild_id: u64) -> Result<Vec<Tag>, StorageError> {
        let mut tags: Vec<Tag> = self
            .store
            .entries()
            .await?
            .into_iter()
            .filter(|(key, _)| key.guild_id == guild_id)
            .map(|(key, record)| Tag::from_parts(key, record))
            .collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tags)
    }
}

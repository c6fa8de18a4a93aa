/// A stored name → response pair scoped to a guild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub name: String,
    pub guild_id: u64,
    pub author_id: u64,
    pub response: String,
}

/// Primary key of a tag row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TagKey {
    pub name: String,
    pub guild_id: u64,
}

impl TagKey {
    /// Builds a key with the name case-normalized
    pub fn new(name: &str, guild_id: u64) -> Self {
        Self {
            name: normalize_tag_name(name),
            guild_id,
        }
    }
}

/// Stored columns of a tag besides its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub author_id: u64,
    pub response: String,
}

impl Tag {
    pub fn from_parts(key: TagKey, record: TagRecord) -> Self {
        Self {
            name: key.name,
            guild_id: key.guild_id,
            author_id: record.author_id,
            response: record.response,
        }
    }
}

pub fn normalize_tag_name(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_normalizes_name() {
        assert_eq!(TagKey::new("  Foo ", 1), TagKey::new("foo", 1));
        assert_ne!(TagKey::new("foo", 1), TagKey::new("foo", 2));
    }
}

//! SQLite tables backing the keyed stores

use rusqlite::{params, Connection, OptionalExtension};
use std::fmt::Debug;
use std::hash::Hash;
use std::path::Path;

use crate::application::errors::StorageError;
use crate::domain::entities::{TagKey, TagRecord};

/// One table, one key column set, one value column set.
///
/// Statements run against whatever connection (or open transaction) the
/// store hands in.
pub trait Table: Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync;
    type Value: Clone + Send + Sync;

    /// Logical store name, used for logging and the default file name
    const NAME: &'static str;
    const CREATE: &'static str;

    fn select(conn: &Connection, key: &Self::Key) -> Result<Option<Self::Value>, StorageError>;
    fn select_all(conn: &Connection) -> Result<Vec<(Self::Key, Self::Value)>, StorageError>;
    fn upsert(conn: &Connection, key: &Self::Key, value: &Self::Value) -> Result<(), StorageError>;
    /// Returns false when a row with the same key already exists
    fn insert(conn: &Connection, key: &Self::Key, value: &Self::Value) -> Result<bool, StorageError>;
    fn delete(conn: &Connection, key: &Self::Key) -> Result<usize, StorageError>;
}

/// Open a database file and create the table.
///
/// Failures are logged and answered with an empty in-memory database so the
/// store still works for the lifetime of the process.
pub fn open_or_memory<T: Table>(path: impl AsRef<Path>) -> Result<Connection, StorageError> {
    let path = path.as_ref();
    match open::<T>(path) {
        Ok(conn) => Ok(conn),
        Err(e) => {
            tracing::error!(
                "Failed to initialize {} database at {}: {}; starting empty",
                T::NAME,
                path.display(),
                e
            );
            open_memory::<T>()
        }
    }
}

fn open<T: Table>(path: &Path) -> Result<Connection, StorageError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    conn.execute(T::CREATE, [])?;
    Ok(conn)
}

pub fn open_memory<T: Table>() -> Result<Connection, StorageError> {
    let conn = Connection::open_in_memory()?;
    conn.execute(T::CREATE, [])?;
    Ok(conn)
}

/// `guild_prefixes`: guild id → JSON list of prefixes
pub struct PrefixTable;

impl Table for PrefixTable {
    type Key = u64;
    type Value = Vec<String>;

    const NAME: &'static str = "prefixes";
    const CREATE: &'static str = "CREATE TABLE IF NOT EXISTS guild_prefixes (
        guild_id INTEGER PRIMARY KEY,
        prefixes TEXT NOT NULL
    )";

    fn select(conn: &Connection, key: &u64) -> Result<Option<Vec<String>>, StorageError> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT prefixes FROM guild_prefixes WHERE guild_id = ?1",
                [*key as i64],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn select_all(conn: &Connection) -> Result<Vec<(u64, Vec<String>)>, StorageError> {
        let mut stmt = conn.prepare("SELECT guild_id, prefixes FROM guild_prefixes")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)? as u64, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut prefixes = Vec::with_capacity(rows.len());
        for (guild_id, json) in rows {
            prefixes.push((guild_id, serde_json::from_str(&json)?));
        }
        Ok(prefixes)
    }

    fn upsert(conn: &Connection, key: &u64, value: &Vec<String>) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO guild_prefixes (guild_id, prefixes) VALUES (?1, ?2)
             ON CONFLICT(guild_id) DO UPDATE SET prefixes = excluded.prefixes",
            params![*key as i64, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    fn insert(conn: &Connection, key: &u64, value: &Vec<String>) -> Result<bool, StorageError> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO guild_prefixes (guild_id, prefixes) VALUES (?1, ?2)",
            params![*key as i64, serde_json::to_string(value)?],
        )?;
        Ok(rows > 0)
    }

    fn delete(conn: &Connection, key: &u64) -> Result<usize, StorageError> {
        Ok(conn.execute("DELETE FROM guild_prefixes WHERE guild_id = ?1", [*key as i64])?)
    }
}

/// `blacklist`: user id → reason
pub struct BlacklistTable;

impl Table for BlacklistTable {
    type Key = u64;
    type Value = String;

    const NAME: &'static str = "blacklist";
    const CREATE: &'static str = "CREATE TABLE IF NOT EXISTS blacklist (
        user_id INTEGER PRIMARY KEY,
        reason TEXT NOT NULL
    )";

    fn select(conn: &Connection, key: &u64) -> Result<Option<String>, StorageError> {
        Ok(conn
            .query_row(
                "SELECT reason FROM blacklist WHERE user_id = ?1",
                [*key as i64],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn select_all(conn: &Connection) -> Result<Vec<(u64, String)>, StorageError> {
        let mut stmt = conn.prepare("SELECT user_id, reason FROM blacklist ORDER BY user_id")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)? as u64, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert(conn: &Connection, key: &u64, value: &String) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO blacklist (user_id, reason) VALUES (?1, ?2)
             ON CONFLICT(user_id) DO UPDATE SET reason = excluded.reason",
            params![*key as i64, value],
        )?;
        Ok(())
    }

    fn insert(conn: &Connection, key: &u64, value: &String) -> Result<bool, StorageError> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO blacklist (user_id, reason) VALUES (?1, ?2)",
            params![*key as i64, value],
        )?;
        Ok(rows > 0)
    }

    fn delete(conn: &Connection, key: &u64) -> Result<usize, StorageError> {
        Ok(conn.execute("DELETE FROM blacklist WHERE user_id = ?1", [*key as i64])?)
    }
}

/// `tags`: (name, guild id) → author and response
pub struct TagTable;

impl Table for TagTable {
    type Key = TagKey;
    type Value = TagRecord;

    const NAME: &'static str = "tags";
    const CREATE: &'static str = "CREATE TABLE IF NOT EXISTS tags (
        name TEXT NOT NULL,
        guild_id INTEGER NOT NULL,
        author_id INTEGER NOT NULL,
        response TEXT NOT NULL,
        PRIMARY KEY (name, guild_id)
    )";

    fn select(conn: &Connection, key: &TagKey) -> Result<Option<TagRecord>, StorageError> {
        Ok(conn
            .query_row(
                "SELECT author_id, response FROM tags WHERE name = ?1 AND guild_id = ?2",
                params![key.name, key.guild_id as i64],
                |row| {
                    Ok(TagRecord {
                        author_id: row.get::<_, i64>(0)? as u64,
                        response: row.get(1)?,
                    })
                },
            )
            .optional()?)
    }

    fn select_all(conn: &Connection) -> Result<Vec<(TagKey, TagRecord)>, StorageError> {
        let mut stmt = conn.prepare(
            "SELECT name, guild_id, author_id, response FROM tags ORDER BY guild_id, name",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    TagKey {
                        name: row.get(0)?,
                        guild_id: row.get::<_, i64>(1)? as u64,
                    },
                    TagRecord {
                        author_id: row.get::<_, i64>(2)? as u64,
                        response: row.get(3)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn upsert(conn: &Connection, key: &TagKey, value: &TagRecord) -> Result<(), StorageError> {
        conn.execute(
            "INSERT INTO tags (name, guild_id, author_id, response) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(name, guild_id) DO UPDATE SET
                author_id = excluded.author_id,
                response = excluded.response",
            params![key.name, key.guild_id as i64, value.author_id as i64, value.response],
        )?;
        Ok(())
    }

    fn insert(conn: &Connection, key: &TagKey, value: &TagRecord) -> Result<bool, StorageError> {
        let rows = conn.execute(
            "INSERT OR IGNORE INTO tags (name, guild_id, author_id, response) VALUES (?1, ?2, ?3, ?4)",
            params![key.name, key.guild_id as i64, value.author_id as i64, value.response],
        )?;
        Ok(rows > 0)
    }

    fn delete(conn: &Connection, key: &TagKey) -> Result<usize, StorageError> {
        Ok(conn.execute(
            "DELETE FROM tags WHERE name = ?1 AND guild_id = ?2",
            params![key.name, key.guild_id as i64],
        )?)
    }
}

//! SQLite-backed key-value table.
//!
//! # Invariants
//! - Connections must be migrated before construction (`kv_entries` exists).
//! - Quota accounting uses UTF-8 byte lengths of keys and values.

use super::{KeyValueStore, StorageError, StorageResult};
use crate::db::{open_db, open_db_in_memory};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

/// Key-value table over one SQLite connection.
pub struct SqliteKvStore {
    conn: Connection,
    quota_bytes: Option<usize>,
}

impl SqliteKvStore {
    /// Wraps a migrated connection.
    pub fn try_new(conn: Connection) -> StorageResult<Self> {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'kv_entries'
            );",
            [],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(StorageError::MissingRequiredTable("kv_entries"));
        }
        Ok(Self {
            conn,
            quota_bytes: None,
        })
    }

    /// Opens (and migrates) a storage file.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a private in-memory table.
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Caps total stored bytes. `None` disables the cap.
    pub fn with_quota(mut self, quota_bytes: Option<usize>) -> Self {
        self.quota_bytes = quota_bytes;
        self
    }

    /// Total bytes currently stored across all keys.
    pub fn used_bytes(&self) -> StorageResult<usize> {
        self.used_bytes_excluding(None)
    }

    fn used_bytes_excluding(&self, key: Option<&str>) -> StorageResult<usize> {
        let used: i64 = self.conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(CAST(key AS BLOB)) + LENGTH(CAST(value AS BLOB))), 0)
             FROM kv_entries
             WHERE ?1 IS NULL OR key <> ?1;",
            [key],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(used).unwrap_or(usize::MAX))
    }

    fn check_quota(&self, key: &str, value: &str) -> StorageResult<()> {
        let Some(quota_bytes) = self.quota_bytes else {
            return Ok(());
        };
        let required_bytes = self
            .used_bytes_excluding(Some(key))?
            .saturating_add(key.len())
            .saturating_add(value.len());
        if required_bytes > quota_bytes {
            return Err(StorageError::QuotaExceeded {
                key: key.to_string(),
                required_bytes,
                quota_bytes,
            });
        }
        Ok(())
    }
}

impl KeyValueStore for SqliteKvStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> StorageResult<()> {
        self.check_quota(key, value)?;
        self.conn.execute(
            "INSERT INTO kv_entries (key, value)
             VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> StorageResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

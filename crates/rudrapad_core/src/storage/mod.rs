//! Origin-scoped key-value storage shared by every context (tab).
//!
//! # Responsibility
//! - Define the `KeyValueStore` seam used by the note store adapter.
//! - Broadcast value changes to every other attached context.
//!
//! # Invariants
//! - A single key write is atomic; readers never see a partial value.
//! - A context never receives events for its own writes.
//! - Writes that leave a value unchanged broadcast nothing.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod origin;
mod sqlite_kv;

pub use origin::{ContextId, ContextStorage, Origin, StorageEvents};
pub use sqlite_kv::SqliteKvStore;

/// Storage key holding the serialized note collection.
pub const NOTES_KEY: &str = "rudrapad-notes";
/// Storage key holding the display theme.
pub const THEME_KEY: &str = "rudrapad-theme";

pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by key-value storage backends.
#[derive(Debug)]
pub enum StorageError {
    Db(DbError),
    /// Writing the value would exceed the origin quota.
    QuotaExceeded {
        key: String,
        required_bytes: usize,
        quota_bytes: usize,
    },
    /// Connection was not migrated for key-value storage.
    MissingRequiredTable(&'static str),
    /// A context panicked while holding the origin lock.
    Poisoned,
}

impl Display for StorageError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded {
                key,
                required_bytes,
                quota_bytes,
            } => write!(
                f,
                "storage quota exceeded writing `{key}`: {required_bytes} bytes required, {quota_bytes} allowed"
            ),
            Self::MissingRequiredTable(table) => write!(f, "missing required table: {table}"),
            Self::Poisoned => write!(f, "origin storage lock poisoned"),
        }
    }
}

impl Error for StorageError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } | Self::MissingRequiredTable(_) | Self::Poisoned => None,
        }
    }
}

impl From<DbError> for StorageError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Notification that another context changed a key.
///
/// Carries immutable snapshots of the old and new raw values. `new_value` is
/// `None` when the key was removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// String key-value store contract.
pub trait KeyValueStore {
    /// Reads the raw value stored at `key`.
    fn get(&self, key: &str) -> StorageResult<Option<String>>;
    /// Writes `value` at `key` in one atomic step.
    fn set(&mut self, key: &str, value: &str) -> StorageResult<()>;
    /// Removes `key`. Missing keys are not an error.
    fn remove(&mut self, key: &str) -> StorageResult<()>;
}

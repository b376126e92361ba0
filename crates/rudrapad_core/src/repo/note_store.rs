//! Store adapter between the note collection and key-value storage.
//!
//! # Responsibility
//! - Load and save the collection blob under `NOTES_KEY`.
//! - Load and save the display theme under `THEME_KEY`.
//!
//! # Invariants
//! - `load` never fails: missing or malformed data yields an empty collection.
//! - `save` writes the whole collection in one key write and never retries.

use crate::model::note::{Note, NoteId};
use crate::model::theme::Theme;
use crate::storage::{KeyValueStore, StorageError, StorageResult, NOTES_KEY, THEME_KEY};
use log::{error, warn};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Save-path failure.
#[derive(Debug)]
pub enum StoreError {
    Serialize(serde_json::Error),
    Storage(StorageError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Serialize(err) => write!(f, "failed to serialize notes: {err}"),
            Self::Storage(err) => write!(f, "failed to write notes: {err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<StorageError> for StoreError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Reasons a raw collection value is rejected.
#[derive(Debug)]
pub enum CollectionError {
    Json(serde_json::Error),
    DuplicateId(NoteId),
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "malformed note collection: {err}"),
            Self::DuplicateId(id) => write!(f, "note collection repeats id `{id}`"),
        }
    }
}

impl Error for CollectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::DuplicateId(_) => None,
        }
    }
}

/// Parses a raw collection value.
///
/// Rejects anything that is not a JSON array of note records, and arrays that
/// repeat an id.
pub fn parse_collection(raw: &str) -> Result<Vec<Note>, CollectionError> {
    let notes: Vec<Note> = serde_json::from_str(raw).map_err(CollectionError::Json)?;
    let mut seen = HashSet::with_capacity(notes.len());
    for note in &notes {
        if !seen.insert(note.id.as_str()) {
            return Err(CollectionError::DuplicateId(note.id.clone()));
        }
    }
    Ok(notes)
}

/// Serializes a collection to its stored form.
pub fn serialize_collection(notes: &[Note]) -> Result<String, serde_json::Error> {
    serde_json::to_string(notes)
}

/// Note collection adapter over a key-value store.
pub struct NoteStore<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> NoteStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    /// Serialized collection as currently held by the store.
    pub fn stored_raw(&self) -> StorageResult<Option<String>> {
        self.storage.get(NOTES_KEY)
    }

    /// Loads the stored collection, degrading to empty on any failure.
    pub fn load(&self) -> Vec<Note> {
        let raw = match self.storage.get(NOTES_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                error!(
                    "event=notes_load module=store status=error error_code=storage_read_failed error={}",
                    err
                );
                return Vec::new();
            }
        };

        match parse_collection(&raw) {
            Ok(notes) => notes,
            Err(err) => {
                warn!(
                    "event=notes_load module=store status=degraded error_code=malformed_collection bytes={} error={}",
                    raw.len(),
                    err
                );
                Vec::new()
            }
        }
    }

    /// Writes the whole collection under `NOTES_KEY`.
    pub fn save(&mut self, notes: &[Note]) -> StoreResult<()> {
        let raw = serialize_collection(notes)?;
        self.storage.set(NOTES_KEY, &raw)?;
        Ok(())
    }

    /// Loads the theme, defaulting to light when missing or unreadable.
    pub fn load_theme(&self) -> Theme {
        match self.storage.get(THEME_KEY) {
            Ok(Some(raw)) => Theme::from_stored(&raw),
            Ok(None) => Theme::default(),
            Err(err) => {
                warn!(
                    "event=theme_load module=store status=degraded error={}",
                    err
                );
                Theme::default()
            }
        }
    }

    pub fn save_theme(&mut self, theme: Theme) -> StoreResult<()> {
        self.storage.set(THEME_KEY, theme.as_str())?;
        Ok(())
    }
}

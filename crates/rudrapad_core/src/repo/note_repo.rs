//! In-memory note collection with persist-on-mutation semantics.
//!
//! # Responsibility
//! - Own the canonical insertion-ordered collection of one context.
//! - Apply create/update/delete/replace and persist after each change.
//! - Track whether memory diverges from the last successful save.
//!
//! # Invariants
//! - Ids are unique within the collection.
//! - Stamps issued by the repository are strictly increasing, so every
//!   mutation moves `last_modified` forward even within one millisecond.
//! - Update/delete on an unknown id leaves memory and storage untouched.
//! - A failed save never rolls back memory.

use crate::clock::{Clock, SystemClock};
use crate::config::DEFAULT_NOTE_TITLE;
use crate::model::note::{Note, NotePatch};
use crate::repo::note_store::{NoteStore, StoreResult};
use crate::storage::KeyValueStore;
use log::{error, info};

/// Result of one repository mutation.
///
/// `value` reflects the in-memory change, which stands even when `saved`
/// reports a storage failure.
#[must_use]
#[derive(Debug)]
pub struct Mutation<T> {
    pub value: T,
    pub saved: StoreResult<()>,
}

impl<T> Mutation<T> {
    pub fn is_saved(&self) -> bool {
        self.saved.is_ok()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Mutation<U> {
        Mutation {
            value: f(self.value),
            saved: self.saved,
        }
    }
}

/// Canonical note collection of one context.
pub struct NoteRepository<S: KeyValueStore, C: Clock = SystemClock> {
    store: NoteStore<S>,
    clock: C,
    notes: Vec<Note>,
    high_water: i64,
    dirty: bool,
    default_title: String,
}

impl<S: KeyValueStore> NoteRepository<S, SystemClock> {
    /// Loads the stored collection using the wall clock.
    pub fn open(store: NoteStore<S>) -> Self {
        Self::open_with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> NoteRepository<S, C> {
    /// Loads the stored collection using `clock` for modification stamps.
    pub fn open_with_clock(store: NoteStore<S>, clock: C) -> Self {
        let notes = store.load();
        info!(
            "event=notes_open module=repo status=ok count={}",
            notes.len()
        );
        let high_water = max_stamp(&notes);
        Self {
            store,
            clock,
            notes,
            high_water,
            dirty: false,
            default_title: DEFAULT_NOTE_TITLE.to_string(),
        }
    }

    /// Overrides the title given to created notes.
    pub fn with_default_title(mut self, title: impl Into<String>) -> Self {
        self.default_title = title.into();
        self
    }

    /// Notes in stored (insertion) order.
    pub fn notes(&self) -> &[Note] {
        &self.notes
    }

    pub fn get(&self, id: &str) -> Option<&Note> {
        self.notes.iter().find(|note| note.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    /// Whether memory holds changes the store has not accepted yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn store(&self) -> &NoteStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut NoteStore<S> {
        &mut self.store
    }

    /// Creates an empty note and prepends it to the collection.
    pub fn create(&mut self) -> Mutation<Note> {
        let note = Note::new(self.default_title.clone(), self.next_stamp());
        self.notes.insert(0, note.clone());
        let saved = self.persist("create");
        Mutation { value: note, saved }
    }

    /// Merges `patch` over the note with `id`.
    ///
    /// Returns the new note value, or `None` when `id` is unknown.
    pub fn update(&mut self, id: &str, patch: &NotePatch) -> Mutation<Option<Note>> {
        let Some(index) = self.position(id) else {
            return Mutation {
                value: None,
                saved: Ok(()),
            };
        };

        let stamp = self.next_stamp();
        let updated = self.notes[index].patched(patch, stamp);
        self.notes[index] = updated.clone();
        let saved = self.persist("update");
        Mutation {
            value: Some(updated),
            saved,
        }
    }

    /// Removes the note with `id`.
    ///
    /// Returns the removed note, or `None` when `id` is unknown.
    pub fn delete(&mut self, id: &str) -> Mutation<Option<Note>> {
        let Some(index) = self.position(id) else {
            return Mutation {
                value: None,
                saved: Ok(()),
            };
        };

        let removed = self.notes.remove(index);
        let saved = self.persist("delete");
        Mutation {
            value: Some(removed),
            saved,
        }
    }

    /// Replaces the whole collection, then persists it.
    pub fn replace_all(&mut self, notes: Vec<Note>) -> Mutation<usize> {
        self.high_water = self.high_water.max(max_stamp(&notes));
        self.notes = notes;
        let saved = self.persist("replace");
        Mutation {
            value: self.notes.len(),
            saved,
        }
    }

    /// Display projection: newest first, filtered by `query`.
    ///
    /// Matching is a case-insensitive substring test over the title and the
    /// plain text of the content. Ties keep stored order.
    pub fn list(&self, query: &str) -> Vec<Note> {
        let needle = query.to_lowercase();
        let mut listed: Vec<Note> = self
            .notes
            .iter()
            .filter(|note| note.matches_lowercase(&needle))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.last_modified.cmp(&a.last_modified));
        listed
    }

    /// Writes the current collection again, e.g. after a failed save.
    pub fn flush(&mut self) -> StoreResult<()> {
        self.persist("flush")
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.notes.iter().position(|note| note.id == id)
    }

    fn next_stamp(&mut self) -> i64 {
        let stamp = self.clock.now_ms().max(self.high_water.saturating_add(1));
        self.high_water = stamp;
        stamp
    }

    fn persist(&mut self, op: &'static str) -> StoreResult<()> {
        match self.store.save(&self.notes) {
            Ok(()) => {
                self.dirty = false;
                Ok(())
            }
            Err(err) => {
                self.dirty = true;
                error!(
                    "event=notes_save module=repo status=error op={} count={} error={}",
                    op,
                    self.notes.len(),
                    err
                );
                Err(err)
            }
        }
    }
}

fn max_stamp(notes: &[Note]) -> i64 {
    notes
        .iter()
        .map(|note| note.last_modified)
        .max()
        .unwrap_or(i64::MIN)
}

#[cfg(test)]
mod tests {
    use super::NoteRepository;
    use crate::clock::ManualClock;
    use crate::model::note::NotePatch;
    use crate::repo::note_store::NoteStore;
    use crate::storage::SqliteKvStore;

    fn repo(now: i64) -> NoteRepository<SqliteKvStore, ManualClock> {
        let store = NoteStore::new(SqliteKvStore::open_in_memory().unwrap());
        NoteRepository::open_with_clock(store, ManualClock::starting_at(now))
    }

    #[test]
    fn stamps_increase_when_clock_stalls() {
        let mut repo = repo(1_000);
        let note = repo.create().value;
        let first = repo.update(&note.id, &NotePatch::title("a")).value.unwrap();
        let second = repo.update(&note.id, &NotePatch::title("b")).value.unwrap();
        assert_eq!(note.last_modified, 1_000);
        assert_eq!(first.last_modified, 1_001);
        assert_eq!(second.last_modified, 1_002);
    }

    #[test]
    fn unknown_ids_are_silent_no_ops() {
        let mut repo = repo(1);
        repo.create().saved.unwrap();
        let before = repo.notes().to_vec();

        let updated = repo.update("missing", &NotePatch::title("x"));
        let deleted = repo.delete("missing");

        assert!(updated.value.is_none() && updated.is_saved());
        assert!(deleted.value.is_none() && deleted.is_saved());
        assert_eq!(repo.notes(), before.as_slice());
    }

    #[test]
    fn custom_default_title_is_used() {
        let mut repo = repo(1).with_default_title("Untitled draft");
        assert_eq!(repo.create().value.title, "Untitled draft");
    }
}

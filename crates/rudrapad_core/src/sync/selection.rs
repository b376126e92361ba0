//! Active note selection.
//!
//! # Invariants
//! - The selection is an id looked up against the current collection, never
//!   a held reference.
//! - After `reconcile`, the selection is `None` only when the collection is
//!   empty, and otherwise names a note that exists.

use crate::model::note::{Note, NoteId};

/// Which note is presented for editing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSelection {
    active_id: Option<NoteId>,
}

impl ActiveSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active_id.as_deref()
    }

    /// Resolves the selection against `notes`.
    pub fn active<'a>(&self, notes: &'a [Note]) -> Option<&'a Note> {
        let id = self.active_id.as_deref()?;
        notes.iter().find(|note| note.id == id)
    }

    /// Selects `id` when it exists in `notes`. Unknown ids are rejected.
    pub fn select(&mut self, notes: &[Note], id: &str) -> bool {
        if notes.iter().any(|note| note.id == id) {
            self.active_id = Some(id.to_string());
            true
        } else {
            false
        }
    }

    /// Re-derives the selection after the collection changed.
    ///
    /// Returns `true` when the active id changed.
    pub fn reconcile(&mut self, notes: &[Note]) -> bool {
        let still_present = match self.active_id.as_deref() {
            Some(id) => notes.iter().any(|note| note.id == id),
            None => false,
        };
        if still_present {
            return false;
        }

        let next = first_in_display_order(notes).map(|note| note.id.clone());
        let changed = next != self.active_id;
        self.active_id = next;
        changed
    }
}

/// First note of the display order: newest `last_modified`, earliest stored
/// position on ties.
pub fn first_in_display_order(notes: &[Note]) -> Option<&Note> {
    notes.iter().fold(None, |best: Option<&Note>, note| match best {
        Some(current) if current.last_modified >= note.last_modified => Some(current),
        _ => Some(note),
    })
}

//! Note domain model.
//!
//! # Responsibility
//! - Define the serialized note shape shared by every context of an origin.
//! - Provide immutable update helpers used by the repository.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `last_modified` is epoch milliseconds and only moves forward on edit.

use crate::text::plain::plain_text;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of one note.
///
/// Kept as a string so collections written by other writers with
/// non-UUID ids still load.
pub type NoteId = String;

/// Canonical note record.
///
/// Field names serialize in camelCase to stay compatible with the stored
/// collection format (`id`, `title`, `content`, `lastModified`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    /// Stable unique id.
    pub id: NoteId,
    /// User-visible title. May be blank.
    pub title: String,
    /// Rich-text markup as committed by the editing surface.
    pub content: String,
    /// Last mutation time in epoch milliseconds.
    pub last_modified: i64,
}

impl Note {
    /// Creates an empty note with a freshly generated id.
    pub fn new(title: impl Into<String>, last_modified: i64) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), title, "", last_modified)
    }

    /// Creates a note with a caller-provided id.
    ///
    /// Used by tests and by import paths where identity already exists.
    pub fn with_id(
        id: impl Into<NoteId>,
        title: impl Into<String>,
        content: impl Into<String>,
        last_modified: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: content.into(),
            last_modified,
        }
    }

    /// Returns a new value with `patch` merged over this note.
    pub fn patched(&self, patch: &NotePatch, last_modified: i64) -> Self {
        Self {
            id: self.id.clone(),
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            content: patch
                .content
                .clone()
                .unwrap_or_else(|| self.content.clone()),
            last_modified,
        }
    }

    /// Plain-text projection of `content` with markup stripped.
    pub fn plain_text(&self) -> String {
        plain_text(&self.content)
    }

    /// Case-insensitive match of an already lowercased query against title
    /// and plain-text content.
    pub fn matches_lowercase(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        self.title.to_lowercase().contains(needle)
            || self.plain_text().to_lowercase().contains(needle)
    }
}

/// Partial note fields merged by `update`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotePatch {
    pub title: Option<String>,
    pub content: Option<String>,
}

impl NotePatch {
    pub fn title(value: impl Into<String>) -> Self {
        Self {
            title: Some(value.into()),
            content: None,
        }
    }

    pub fn content(value: impl Into<String>) -> Self {
        Self {
            title: None,
            content: Some(value.into()),
        }
    }

    pub fn with_title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn with_content(mut self, value: impl Into<String>) -> Self {
        self.content = Some(value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{Note, NotePatch};

    #[test]
    fn serializes_with_camel_case_fields() {
        let note = Note::with_id("n1", "Title", "<b>x</b>", 42);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(
            json,
            r#"{"id":"n1","title":"Title","content":"<b>x</b>","lastModified":42}"#
        );
    }

    #[test]
    fn patched_keeps_unset_fields_and_id() {
        let note = Note::with_id("n1", "Old", "body", 1);
        let updated = note.patched(&NotePatch::title("New"), 5);
        assert_eq!(updated.id, "n1");
        assert_eq!(updated.title, "New");
        assert_eq!(updated.content, "body");
        assert_eq!(updated.last_modified, 5);
    }

    #[test]
    fn new_notes_get_distinct_ids() {
        let first = Note::new("New Note", 1);
        let second = Note::new("New Note", 1);
        assert_ne!(first.id, second.id);
        assert!(first.content.is_empty());
    }

    #[test]
    fn matching_ignores_markup_and_case() {
        let note = Note::with_id("n1", "Groceries", "<p>Buy <b>MILK</b></p>", 1);
        assert!(note.matches_lowercase("milk"));
        assert!(note.matches_lowercase("grocer"));
        assert!(!note.matches_lowercase("<b>"));
    }
}

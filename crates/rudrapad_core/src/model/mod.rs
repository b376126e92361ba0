//! Domain model for notes and display preferences.
//!
//! # Responsibility
//! - Define the canonical `Note` record persisted under the notes key.
//! - Define the partial-update shape applied by the repository.
//!
//! # Invariants
//! - Every note is identified by a stable `NoteId` for its whole lifetime.
//! - Notes are replaced immutably on edit; nothing mutates a stored value in place.

pub mod note;
pub mod theme;

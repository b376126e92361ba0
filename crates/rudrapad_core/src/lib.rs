//! Core state model for RudraPad notes.
//!
//! Owns the note collection, its persistence in origin-scoped key-value
//! storage, and reconciliation with writes from other contexts sharing that
//! storage.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod storage;
pub mod sync;
pub mod text;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_with, logging_status};
pub use model::note::{Note, NoteId, NotePatch};
pub use model::theme::Theme;
pub use repo::note_repo::{Mutation, NoteRepository};
pub use repo::note_store::{
    parse_collection, serialize_collection, CollectionError, NoteStore, StoreError, StoreResult,
};
pub use service::export::{export_plain_text, ExportFile};
pub use service::session::{Draft, NotesSession, SessionError, SessionResult};
pub use service::unlock::{UnlockGate, WrongPassword};
pub use storage::{
    ContextId, ContextStorage, KeyValueStore, Origin, SqliteKvStore, StorageError, StorageEvent,
    StorageEvents, StorageResult, NOTES_KEY, THEME_KEY,
};
pub use sync::reconciler::{apply_event, ReconcileOutcome, Reconciler};
pub use sync::selection::{first_in_display_order, ActiveSelection};
pub use text::plain::{content_preview, plain_text, title_label, TextStats};

/// Minimal health-check API for smoke checks.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}

//! Per-context notes session.
//!
//! # Responsibility
//! - Tie repository, selection, reconciler and unlock gate together for one
//!   context (tab).
//! - Hold the editor draft of the active note and its dirty flag.
//! - Expose theme, search, and export use-cases.
//!
//! # Invariants
//! - Note operations require an unlocked session; reconciliation does not.
//! - Selection is re-derived after every mutation and every reconciliation.
//! - A dirty draft is never overwritten by reconciliation or re-selection of
//!   the same note; switching to another note discards it.

use crate::clock::{Clock, SystemClock};
use crate::config::CoreConfig;
use crate::model::note::{Note, NoteId, NotePatch};
use crate::model::theme::Theme;
use crate::repo::note_repo::{Mutation, NoteRepository};
use crate::repo::note_store::{NoteStore, StoreError};
use crate::service::export::{export_plain_text, ExportFile};
use crate::service::unlock::{UnlockGate, WrongPassword};
use crate::storage::{ContextStorage, KeyValueStore, Origin, StorageError, StorageEvents};
use crate::sync::reconciler::{ReconcileOutcome, Reconciler};
use crate::sync::selection::ActiveSelection;
use crate::text::plain::TextStats;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SessionResult<T> = Result<T, SessionError>;

/// Session use-case errors.
#[derive(Debug)]
pub enum SessionError {
    /// Operation needs an unlocked session.
    Locked,
    WrongPassword(WrongPassword),
    NoteNotFound(NoteId),
    /// Draft operation without an active note.
    NoActiveNote,
    Store(StoreError),
    Storage(StorageError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Locked => write!(f, "session is locked"),
            Self::WrongPassword(err) => write!(f, "{err}"),
            Self::NoteNotFound(id) => write!(f, "note not found: {id}"),
            Self::NoActiveNote => write!(f, "no note is selected"),
            Self::Store(err) => write!(f, "{err}"),
            Self::Storage(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WrongPassword(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Locked | Self::NoteNotFound(_) | Self::NoActiveNote => None,
        }
    }
}

impl From<WrongPassword> for SessionError {
    fn from(value: WrongPassword) -> Self {
        Self::WrongPassword(value)
    }
}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<StorageError> for SessionError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Uncommitted editor copy of the active note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    note_id: NoteId,
    title: String,
    content: String,
    dirty: bool,
    base_modified: i64,
}

impl Draft {
    fn from_note(note: &Note) -> Self {
        Self {
            note_id: note.id.clone(),
            title: note.title.clone(),
            content: note.content.clone(),
            dirty: false,
            base_modified: note.last_modified,
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the draft holds edits not yet committed to the collection.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn stats(&self) -> TextStats {
        TextStats::of_markup(&self.content)
    }

    fn as_note(&self) -> Note {
        Note::with_id(
            self.note_id.clone(),
            self.title.clone(),
            self.content.clone(),
            self.base_modified,
        )
    }
}

/// Notes state of one context.
pub struct NotesSession<S: KeyValueStore, C: Clock = SystemClock> {
    repo: NoteRepository<S, C>,
    selection: ActiveSelection,
    reconciler: Option<Reconciler>,
    gate: UnlockGate,
    draft: Option<Draft>,
    search_query: String,
    theme: Theme,
}

impl NotesSession<ContextStorage, SystemClock> {
    /// Attaches a new context to `origin` and loads its notes.
    pub fn attach(origin: &Origin, config: &CoreConfig) -> SessionResult<Self> {
        Self::attach_with_clock(origin, config, SystemClock)
    }
}

impl<C: Clock> NotesSession<ContextStorage, C> {
    pub fn attach_with_clock(
        origin: &Origin,
        config: &CoreConfig,
        clock: C,
    ) -> SessionResult<Self> {
        let (storage, events) = origin.attach()?;
        info!(
            "event=session_attach module=session status=ok context={}",
            storage.context()
        );
        Ok(Self::new(NoteStore::new(storage), Some(events), clock, config))
    }
}

impl<S: KeyValueStore, C: Clock> NotesSession<S, C> {
    /// Builds a locked session over `store`.
    ///
    /// Without `events` the session never observes external writes.
    pub fn new(
        store: NoteStore<S>,
        events: Option<StorageEvents>,
        clock: C,
        config: &CoreConfig,
    ) -> Self {
        let repo = NoteRepository::open_with_clock(store, clock)
            .with_default_title(config.default_note_title.clone());
        let theme = repo.store().load_theme();
        let mut session = Self {
            repo,
            selection: ActiveSelection::new(),
            reconciler: events.map(Reconciler::new),
            gate: UnlockGate::new(config.passphrase.clone()),
            draft: None,
            search_query: String::new(),
            theme,
        };
        session.after_collection_change();
        session
    }

    pub fn is_unlocked(&self) -> bool {
        self.gate.is_unlocked()
    }

    pub fn unlock(&mut self, attempt: &str) -> SessionResult<()> {
        match self.gate.unlock(attempt) {
            Ok(()) => {
                info!("event=session_unlock module=session status=ok");
                Ok(())
            }
            Err(err) => {
                warn!("event=session_unlock module=session status=rejected");
                Err(err.into())
            }
        }
    }

    pub fn lock(&mut self) {
        self.gate.lock();
        info!("event=session_lock module=session status=ok");
    }

    pub fn repository(&self) -> &NoteRepository<S, C> {
        &self.repo
    }

    pub fn active_id(&self) -> Option<&str> {
        self.selection.active_id()
    }

    pub fn active_note(&self) -> Option<&Note> {
        self.selection.active(self.repo.notes())
    }

    /// Creates a note and makes it active.
    pub fn new_note(&mut self) -> SessionResult<Mutation<Note>> {
        self.ensure_unlocked()?;
        let created = self.repo.create();
        self.selection.select(self.repo.notes(), &created.value.id);
        self.after_collection_change();
        info!(
            "event=note_create module=session status=ok saved={} count={}",
            created.is_saved(),
            self.repo.len()
        );
        Ok(created)
    }

    pub fn select_note(&mut self, id: &str) -> SessionResult<()> {
        self.ensure_unlocked()?;
        if !self.selection.select(self.repo.notes(), id) {
            return Err(SessionError::NoteNotFound(id.to_string()));
        }
        self.refresh_draft();
        Ok(())
    }

    /// Merges `patch` into the note with `id`; unknown ids are a no-op.
    pub fn update_note(
        &mut self,
        id: &str,
        patch: &NotePatch,
    ) -> SessionResult<Mutation<Option<Note>>> {
        self.ensure_unlocked()?;
        let updated = self.repo.update(id, patch);
        self.after_collection_change();
        Ok(updated)
    }

    /// Deletes the note with `id`; unknown ids are a no-op.
    pub fn delete_note(&mut self, id: &str) -> SessionResult<Mutation<Option<Note>>> {
        self.ensure_unlocked()?;
        let deleted = self.repo.delete(id);
        self.after_collection_change();
        if deleted.value.is_some() {
            info!(
                "event=note_delete module=session status=ok saved={} count={}",
                deleted.is_saved(),
                self.repo.len()
            );
        }
        Ok(deleted)
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
    }

    /// Notes matching the current search query, newest first.
    pub fn visible_notes(&self) -> SessionResult<Vec<Note>> {
        self.ensure_unlocked()?;
        Ok(self.repo.list(&self.search_query))
    }

    pub fn draft(&self) -> Option<&Draft> {
        self.draft.as_ref()
    }

    pub fn edit_title(&mut self, title: impl Into<String>) -> SessionResult<()> {
        let draft = self.draft_mut()?;
        draft.title = title.into();
        draft.dirty = true;
        Ok(())
    }

    pub fn edit_content(&mut self, markup: impl Into<String>) -> SessionResult<()> {
        let draft = self.draft_mut()?;
        draft.content = markup.into();
        draft.dirty = true;
        Ok(())
    }

    /// Commits the draft title and content to the active note.
    pub fn save_draft(&mut self) -> SessionResult<Mutation<Option<Note>>> {
        let draft = self.draft_mut()?;
        let id = draft.note_id.clone();
        let patch = NotePatch::title(draft.title.clone()).with_content(draft.content.clone());

        let updated = self.repo.update(&id, &patch);
        if let (Some(note), Some(draft)) = (updated.value.as_ref(), self.draft.as_mut()) {
            draft.dirty = false;
            draft.base_modified = note.last_modified;
        }
        self.after_collection_change();
        Ok(updated)
    }

    /// Whether anything is unsaved: a dirty draft or a failed store write.
    pub fn has_unsaved_changes(&self) -> bool {
        self.repo.is_dirty() || self.draft.as_ref().is_some_and(Draft::is_dirty)
    }

    /// Rewrites the collection after an earlier save failure.
    pub fn retry_save(&mut self) -> SessionResult<()> {
        self.ensure_unlocked()?;
        self.repo.flush()?;
        Ok(())
    }

    /// Applies pending writes from other contexts.
    pub fn sync(&mut self) -> Vec<ReconcileOutcome> {
        let Some(reconciler) = self.reconciler.as_ref() else {
            return Vec::new();
        };
        let outcomes = reconciler.poll(&mut self.repo, &mut self.selection);
        if !outcomes.is_empty() {
            self.refresh_draft();
        }
        outcomes
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Flips the theme and persists it. The in-memory value changes even when
    /// the write fails.
    pub fn toggle_theme(&mut self) -> SessionResult<Mutation<Theme>> {
        self.set_theme(self.theme.toggled())
    }

    pub fn set_theme(&mut self, theme: Theme) -> SessionResult<Mutation<Theme>> {
        self.ensure_unlocked()?;
        self.theme = theme;
        let saved = self.repo.store_mut().save_theme(theme);
        if let Err(err) = &saved {
            warn!(
                "event=theme_save module=session status=error theme={} error={}",
                theme, err
            );
        }
        Ok(Mutation { value: theme, saved })
    }

    /// Exports the active note as currently shown in the editor draft.
    pub fn export_active(&self) -> SessionResult<ExportFile> {
        self.ensure_unlocked()?;
        let draft = self.draft.as_ref().ok_or(SessionError::NoActiveNote)?;
        Ok(export_plain_text(&draft.as_note()))
    }

    pub fn export_note(&self, id: &str) -> SessionResult<ExportFile> {
        self.ensure_unlocked()?;
        self.repo
            .get(id)
            .map(export_plain_text)
            .ok_or_else(|| SessionError::NoteNotFound(id.to_string()))
    }

    fn ensure_unlocked(&self) -> SessionResult<()> {
        if self.gate.is_unlocked() {
            Ok(())
        } else {
            Err(SessionError::Locked)
        }
    }

    fn draft_mut(&mut self) -> SessionResult<&mut Draft> {
        self.ensure_unlocked()?;
        self.draft.as_mut().ok_or(SessionError::NoActiveNote)
    }

    fn after_collection_change(&mut self) {
        self.selection.reconcile(self.repo.notes());
        self.refresh_draft();
    }

    fn refresh_draft(&mut self) {
        let Some(active) = self.selection.active(self.repo.notes()) else {
            self.draft = None;
            return;
        };
        let keep = self.draft.as_ref().is_some_and(|draft| {
            draft.note_id == active.id
                && (draft.dirty || draft.base_modified == active.last_modified)
        });
        if !keep {
            self.draft = Some(Draft::from_note(active));
        }
    }
}

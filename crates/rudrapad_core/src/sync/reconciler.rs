//! Reconciliation of external writes to the notes key.
//!
//! # Responsibility
//! - Filter storage events down to the notes key.
//! - Replace the local collection with valid external snapshots.
//!
//! # Invariants
//! - Only a snapshot equal to the value currently held by the store is
//!   applied. Older queued snapshots are superseded and never written back,
//!   so the last save wins in every context and reconciliation quiesces.
//! - Rejected and superseded snapshots leave the repository and selection
//!   untouched.

use crate::clock::Clock;
use crate::repo::note_repo::NoteRepository;
use crate::repo::note_store::{parse_collection, StoreResult};
use crate::storage::{KeyValueStore, StorageEvent, StorageEvents, NOTES_KEY};
use crate::sync::selection::ActiveSelection;
use log::{debug, info, warn};

/// What one storage event did to local state.
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// Event was for another key.
    Ignored { key: String },
    /// A later write already replaced this snapshot in the store.
    Superseded,
    /// Snapshot could not be parsed or checked; local state kept.
    Rejected { reason: String },
    /// Local collection replaced by the snapshot.
    Replaced {
        notes: usize,
        selection_changed: bool,
        saved: StoreResult<()>,
    },
}

impl ReconcileOutcome {
    pub fn is_replaced(&self) -> bool {
        matches!(self, Self::Replaced { .. })
    }
}

/// Subscriber for external writes of one context.
pub struct Reconciler {
    events: StorageEvents,
}

impl Reconciler {
    pub fn new(events: StorageEvents) -> Self {
        Self { events }
    }

    /// Applies every pending event in arrival order.
    pub fn poll<S, C>(
        &self,
        repo: &mut NoteRepository<S, C>,
        selection: &mut ActiveSelection,
    ) -> Vec<ReconcileOutcome>
    where
        S: KeyValueStore,
        C: Clock,
    {
        self.events
            .drain()
            .iter()
            .map(|event| apply_event(event, repo, selection))
            .collect()
    }
}

/// Applies one storage event to `repo` and `selection`.
///
/// A removed notes key is treated as an empty collection. The event is
/// skipped when the store no longer holds `event.new_value`.
pub fn apply_event<S, C>(
    event: &StorageEvent,
    repo: &mut NoteRepository<S, C>,
    selection: &mut ActiveSelection,
) -> ReconcileOutcome
where
    S: KeyValueStore,
    C: Clock,
{
    if event.key != NOTES_KEY {
        return ReconcileOutcome::Ignored {
            key: event.key.clone(),
        };
    }

    match repo.store().stored_raw() {
        Ok(current) if current == event.new_value => {}
        Ok(_) => {
            debug!("event=notes_reconcile module=sync status=superseded");
            return ReconcileOutcome::Superseded;
        }
        Err(err) => {
            warn!(
                "event=notes_reconcile module=sync status=rejected error_code=storage_read_failed error={}",
                err
            );
            return ReconcileOutcome::Rejected {
                reason: err.to_string(),
            };
        }
    }

    let snapshot = match event.new_value.as_deref() {
        None => Vec::new(),
        Some(raw) => match parse_collection(raw) {
            Ok(notes) => notes,
            Err(err) => {
                warn!(
                    "event=notes_reconcile module=sync status=rejected bytes={} error={}",
                    raw.len(),
                    err
                );
                return ReconcileOutcome::Rejected {
                    reason: err.to_string(),
                };
            }
        },
    };

    let replaced = repo.replace_all(snapshot);
    let selection_changed = selection.reconcile(repo.notes());
    info!(
        "event=notes_reconcile module=sync status=ok count={} selection_changed={}",
        replaced.value, selection_changed
    );
    ReconcileOutcome::Replaced {
        notes: replaced.value,
        selection_changed,
        saved: replaced.saved,
    }
}

#[cfg(test)]
mod tests {
    use super::{apply_event, ReconcileOutcome};
    use crate::clock::ManualClock;
    use crate::model::note::Note;
    use crate::repo::note_repo::NoteRepository;
    use crate::repo::note_store::NoteStore;
    use crate::storage::{KeyValueStore, SqliteKvStore, StorageEvent, NOTES_KEY, THEME_KEY};
    use crate::sync::selection::ActiveSelection;

    fn event(key: &str, new_value: Option<&str>) -> StorageEvent {
        StorageEvent {
            key: key.to_string(),
            old_value: None,
            new_value: new_value.map(str::to_string),
        }
    }

    fn repo() -> NoteRepository<SqliteKvStore, ManualClock> {
        let store = NoteStore::new(SqliteKvStore::open_in_memory().unwrap());
        NoteRepository::open_with_clock(store, ManualClock::starting_at(100))
    }

    /// Puts `raw` in the store as if another context had just written it.
    fn external_write(repo: &mut NoteRepository<SqliteKvStore, ManualClock>, raw: Option<&str>) {
        let storage = repo.store_mut().storage_mut();
        match raw {
            Some(raw) => storage.set(NOTES_KEY, raw).unwrap(),
            None => storage.remove(NOTES_KEY).unwrap(),
        }
    }

    #[test]
    fn other_keys_are_ignored() {
        let mut repo = repo();
        let mut selection = ActiveSelection::new();
        let outcome = apply_event(&event(THEME_KEY, Some("dark")), &mut repo, &mut selection);
        assert!(matches!(outcome, ReconcileOutcome::Ignored { key } if key == THEME_KEY));
    }

    #[test]
    fn removed_key_clears_collection_and_selection() {
        let mut repo = repo();
        let created = repo.create().value;
        let mut selection = ActiveSelection::new();
        assert!(selection.select(repo.notes(), &created.id));

        external_write(&mut repo, None);
        let outcome = apply_event(&event(NOTES_KEY, None), &mut repo, &mut selection);
        assert!(outcome.is_replaced());
        assert!(repo.is_empty());
        assert_eq!(selection.active_id(), None);
    }

    #[test]
    fn corrupt_snapshot_keeps_local_state() {
        let mut repo = repo();
        repo.create().saved.unwrap();
        let before = repo.notes().to_vec();
        let mut selection = ActiveSelection::new();

        external_write(&mut repo, Some("[{broken"));
        let outcome = apply_event(&event(NOTES_KEY, Some("[{broken")), &mut repo, &mut selection);
        assert!(matches!(outcome, ReconcileOutcome::Rejected { .. }));
        assert_eq!(repo.notes(), before.as_slice());
    }

    #[test]
    fn valid_snapshot_replaces_collection_exactly() {
        let mut repo = repo();
        repo.create().saved.unwrap();
        let external = vec![
            Note::with_id("x", "X", "<p>x</p>", 5),
            Note::with_id("y", "Y", "", 9),
        ];
        let raw = serde_json::to_string(&external).unwrap();
        let mut selection = ActiveSelection::new();

        external_write(&mut repo, Some(&raw));
        apply_event(&event(NOTES_KEY, Some(&raw)), &mut repo, &mut selection);
        assert_eq!(repo.notes(), external.as_slice());
        assert_eq!(selection.active_id(), Some("y"));
    }

    #[test]
    fn snapshot_replaced_in_store_is_superseded_without_writing() {
        let mut repo = repo();
        let own = repo.create().value;
        let stored_before = repo.store().stored_raw().unwrap();
        let stale = serde_json::to_string(&[Note::with_id("old", "Old", "", 1)]).unwrap();
        let mut selection = ActiveSelection::new();
        assert!(selection.select(repo.notes(), &own.id));

        let outcome = apply_event(&event(NOTES_KEY, Some(&stale)), &mut repo, &mut selection);
        assert!(matches!(outcome, ReconcileOutcome::Superseded));
        assert!(repo.contains(&own.id));
        assert_eq!(repo.store().stored_raw().unwrap(), stored_before);
        assert_eq!(selection.active_id(), Some(own.id.as_str()));
    }
}

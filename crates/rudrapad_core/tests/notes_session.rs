use rudrapad_core::{
    ContextStorage, CoreConfig, ManualClock, NotePatch, NotesSession, Origin, SessionError, Theme,
};

fn open_session(origin: &Origin, clock: &ManualClock) -> NotesSession<ContextStorage, ManualClock> {
    NotesSession::attach_with_clock(origin, &CoreConfig::default(), clock.clone()).unwrap()
}

fn unlocked_session(origin: &Origin, clock: &ManualClock) -> NotesSession<ContextStorage, ManualClock> {
    let mut session = open_session(origin, clock);
    session.unlock("RudraPad").unwrap();
    session
}

#[test]
fn locked_session_rejects_note_operations() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = open_session(&origin, &clock);

    assert!(!session.is_unlocked());
    assert!(matches!(session.new_note(), Err(SessionError::Locked)));
    assert!(matches!(session.visible_notes(), Err(SessionError::Locked)));
    assert!(matches!(
        session.delete_note("any"),
        Err(SessionError::Locked)
    ));

    let err = session.unlock("wrong").unwrap_err();
    assert_eq!(err.to_string(), "Incorrect password. Please try again.");
    assert!(!session.is_unlocked());

    session.unlock("RudraPad").unwrap();
    session.new_note().unwrap().saved.unwrap();
    session.lock();
    assert!(matches!(session.visible_notes(), Err(SessionError::Locked)));
}

#[test]
fn configured_passphrase_replaces_default() {
    let origin = Origin::open_in_memory(None).unwrap();
    let config = CoreConfig::default().with_passphrase("open sesame").unwrap();
    let mut session = NotesSession::attach(&origin, &config).unwrap();

    assert!(session.unlock("RudraPad").is_err());
    session.unlock("open sesame").unwrap();
}

#[test]
fn new_note_becomes_active_and_scenario_keeps_selection() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);

    let n1 = session.new_note().unwrap().value;
    assert_eq!(session.active_id(), Some(n1.id.as_str()));

    clock.advance(1);
    let n2 = session.new_note().unwrap().value;
    assert_eq!(session.active_id(), Some(n2.id.as_str()));

    clock.advance(1);
    session
        .update_note(&n1.id, &NotePatch::title("Shopping"))
        .unwrap()
        .saved
        .unwrap();
    let visible: Vec<String> = session
        .visible_notes()
        .unwrap()
        .into_iter()
        .map(|note| note.id)
        .collect();
    assert_eq!(visible, vec![n1.id.clone(), n2.id.clone()]);

    session.select_note(&n1.id).unwrap();
    session.delete_note(&n2.id).unwrap().saved.unwrap();
    assert_eq!(session.repository().len(), 1);
    assert_eq!(session.active_id(), Some(n1.id.as_str()));
}

#[test]
fn deleting_active_note_falls_back_then_clears() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);

    let b = session.new_note().unwrap().value;
    clock.advance(1);
    let a = session.new_note().unwrap().value;
    assert_eq!(session.active_id(), Some(a.id.as_str()));

    session.delete_note(&a.id).unwrap().saved.unwrap();
    assert_eq!(session.active_id(), Some(b.id.as_str()));
    assert_eq!(session.draft().unwrap().note_id(), b.id);

    session.delete_note(&b.id).unwrap().saved.unwrap();
    assert_eq!(session.active_id(), None);
    assert!(session.active_note().is_none());
}

#[test]
fn deleting_unknown_note_is_a_no_op() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);
    session.new_note().unwrap().saved.unwrap();

    let outcome = session.delete_note("missing").unwrap();
    assert!(outcome.value.is_none());
    assert_eq!(session.repository().len(), 1);
}

#[test]
fn selecting_unknown_note_is_an_error() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);

    match session.select_note("ghost").unwrap_err() {
        SessionError::NoteNotFound(id) => assert_eq!(id, "ghost"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn search_query_filters_visible_notes() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);

    let recipe = session.new_note().unwrap().value;
    session
        .update_note(
            &recipe.id,
            &NotePatch::title("Recipe").with_content("<p>Add <i>Garlic</i></p>"),
        )
        .unwrap()
        .saved
        .unwrap();
    session.new_note().unwrap().saved.unwrap();

    session.set_search_query("garlic");
    let visible = session.visible_notes().unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, recipe.id);

    session.set_search_query("");
    assert_eq!(session.visible_notes().unwrap().len(), 2);
}

#[test]
fn theme_persists_across_sessions() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = open_session(&origin, &clock);
    assert_eq!(session.theme(), Theme::Light);
    assert!(matches!(session.toggle_theme(), Err(SessionError::Locked)));
    assert_eq!(session.theme(), Theme::Light);

    session.unlock("RudraPad").unwrap();
    let toggled = session.toggle_theme().unwrap();
    assert!(toggled.is_saved());
    assert_eq!(toggled.value, Theme::Dark);

    let reopened = open_session(&origin, &clock);
    assert_eq!(reopened.theme(), Theme::Dark);
}

#[test]
fn export_uses_draft_title_and_plain_text() {
    let origin = Origin::open_in_memory(None).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);
    let note = session.new_note().unwrap().value;

    session.edit_title("Packing list").unwrap();
    session
        .edit_content("<div>socks</div><div>hat &amp; scarf</div>")
        .unwrap();

    let file = session.export_active().unwrap();
    assert_eq!(file.file_name, "Packing_list.txt");
    assert_eq!(file.body, "socks\nhat & scarf");

    let stored = session.export_note(&note.id).unwrap();
    assert_eq!(stored.file_name, "New_Note.txt");
    assert_eq!(stored.body, "");
}

#[test]
fn quota_failure_is_reported_and_state_kept_until_retry() {
    let origin = Origin::open_in_memory(Some(400)).unwrap();
    let clock = ManualClock::starting_at(1_000);
    let mut session = unlocked_session(&origin, &clock);
    let note = session.new_note().unwrap().value;

    session.edit_content("y".repeat(1_000)).unwrap();
    let saved = session.save_draft().unwrap();
    assert!(!saved.is_saved());
    assert_eq!(
        session.repository().get(&note.id).unwrap().content.len(),
        1_000
    );
    assert!(session.has_unsaved_changes());
    assert!(matches!(session.retry_save(), Err(SessionError::Store(_))));

    session.edit_content("short").unwrap();
    session.save_draft().unwrap().saved.unwrap();
    assert!(!session.has_unsaved_changes());
}

#[test]
fn file_backed_notes_survive_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rudrapad.sqlite3");
    let clock = ManualClock::starting_at(1_000);

    let created = {
        let origin = Origin::open(&path, None).unwrap();
        let mut session = unlocked_session(&origin, &clock);
        let note = session.new_note().unwrap().value;
        session
            .update_note(&note.id, &NotePatch::title("Persisted"))
            .unwrap()
            .saved
            .unwrap();
        note
    };

    let origin = Origin::open(&path, None).unwrap();
    let session = unlocked_session(&origin, &clock);
    assert_eq!(session.active_id(), Some(created.id.as_str()));
    assert_eq!(session.active_note().unwrap().title, "Persisted");
}

use medinote_core::db::open_db_in_memory;
use medinote_core::settings::AutosaveSettings;
use medinote_core::{
    AutosaveController, AutosavePhase, FormatKind, Note, NoteId, NotePersistence, NoteRepository,
    NoteService, NoteSession, SelectionRange, ServiceError, Settings, SqliteNoteRepository,
};
use std::time::{Duration, Instant};

#[derive(Default)]
struct CountingStore {
    saves: Vec<(NoteId, String, String)>,
}

impl NotePersistence for CountingStore {
    fn save(&mut self, id: NoteId, title: &str, content: &str) -> Result<(), ServiceError> {
        self.saves
            .push((id, title.to_string(), content.to_string()));
        Ok(())
    }

    fn load(&mut self) -> Result<Vec<Note>, ServiceError> {
        Ok(Vec::new())
    }
}

#[test]
fn rapid_mutations_produce_exactly_one_save_after_quiet_period() {
    let interval = Duration::from_millis(2_000);
    let start = Instant::now();
    let mut autosave = AutosaveController::new(&AutosaveSettings {
        enabled: true,
        interval_ms: 2_000,
    });
    let note = Note::new("Rounds", "<p>bp</p>", 0);
    let mut store = CountingStore::default();

    for step in 0..20u64 {
        let at = start + Duration::from_millis(step * 150);
        autosave.notify_change(at);
        assert!(autosave.tick(at, &note, &mut store).is_none());
    }
    let last = start + Duration::from_millis(19 * 150);

    let mut now = last;
    while now < last + interval + Duration::from_millis(500) {
        autosave.tick(now, &note, &mut store);
        now += Duration::from_millis(50);
    }

    assert_eq!(store.saves.len(), 1);
    assert_eq!(autosave.phase(), AutosavePhase::Idle);
}

#[test]
fn session_edits_are_flushed_to_sqlite() {
    let conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::new(&conn));
    let note = service.create_note("", "chest pain").unwrap();

    let start = Instant::now();
    let mut session = NoteSession::open(note.clone(), &Settings::default());
    session
        .apply_format(SelectionRange::new(0, 5), &FormatKind::Bold, start)
        .unwrap();
    session.rename("Admission", start + Duration::from_millis(10));
    assert!(session
        .tick(start + Duration::from_millis(1_000), &mut service)
        .is_none());

    let saved = session.tick(start + Duration::from_millis(2_010), &mut service);
    assert!(matches!(saved, Some(Ok(()))));

    let stored = SqliteNoteRepository::new(&conn)
        .get_note(note.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Admission");
    assert_eq!(stored.content, "<strong>chest</strong> pain");
    assert!(stored.last_modified > note.last_modified);
}

#[test]
fn mutation_during_save_schedules_one_follow_up() {
    let start = Instant::now();
    let mut autosave = AutosaveController::new(&AutosaveSettings::default());
    autosave.notify_change(start);
    let ticket = autosave.poll(start + Duration::from_secs(2)).unwrap();

    autosave.notify_change(start + Duration::from_millis(2_050));
    autosave.notify_change(start + Duration::from_millis(2_060));
    let finished = start + Duration::from_millis(2_100);
    autosave.complete(ticket, Ok(()), finished).unwrap();

    assert_eq!(autosave.phase(), AutosavePhase::PendingSave);
    assert!(autosave.poll(finished + Duration::from_millis(1_999)).is_none());
    assert!(autosave.poll(finished + Duration::from_secs(2)).is_some());
}

#[test]
fn closing_session_flushes_pending_change() {
    let conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::new(&conn));
    let note = service.create_note("Discharge", "").unwrap();

    let now = Instant::now();
    let mut session = NoteSession::open(note.clone(), &Settings::default());
    session.insert_content("Summary text", false, now);
    let closed = session.close(now, &mut service).unwrap();
    assert_eq!(closed.content, "Summary text");

    let loaded = service.load().unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].content, "Summary text");
}

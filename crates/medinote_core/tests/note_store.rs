use medinote_core::db::open_db_in_memory;
use medinote_core::{
    EditorError, NotFound, NotePersistence, NoteRepository, NoteService, SqliteNoteRepository,
};
use rusqlite::params;

fn frozen_clock() -> i64 {
    42
}

#[test]
fn last_modified_strictly_increases_across_saves() {
    let conn = open_db_in_memory().unwrap();
    let mut service = NoteService::with_clock(SqliteNoteRepository::new(&conn), frozen_clock);
    let note = service.create_note("Ward round", "").unwrap();

    let mut previous = note.last_modified;
    for round in 0..5 {
        service
            .save(note.id, "Ward round", &format!("<p>v{round}</p>"))
            .unwrap();
        let stored = service.get_note(note.id).unwrap().unwrap();
        assert!(stored.last_modified > previous);
        previous = stored.last_modified;
    }
}

#[test]
fn list_is_ordered_by_last_modified_then_uuid() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteNoteRepository::new(&conn));
    let first = service.create_note("first", "").unwrap();
    let second = service.create_note("second", "").unwrap();
    let third = service.create_note("third", "").unwrap();

    for (id, stamp) in [(first.id, 3_000), (second.id, 1_000), (third.id, 3_000)] {
        conn.execute(
            "UPDATE notes SET last_modified = ?2 WHERE uuid = ?1;",
            params![id.to_string(), stamp],
        )
        .unwrap();
    }

    let listed = service.list_notes(None, None, 0).unwrap();
    let ids: Vec<_> = listed.items.iter().map(|item| item.id).collect();
    let (a, b) = if first.id.to_string() < third.id.to_string() {
        (first.id, third.id)
    } else {
        (third.id, first.id)
    };
    assert_eq!(ids, vec![a, b, second.id]);
}

#[test]
fn pagination_and_search() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteNoteRepository::new(&conn));
    for index in 0..5 {
        service
            .create_note(&format!("Patient {index}"), "<p>hypertension</p>")
            .unwrap();
    }
    service.create_note("Other", "<p>asthma</p>").unwrap();

    let page = service.list_notes(None, Some(2), 2).unwrap();
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.offset, 2);

    let found = service
        .list_notes(Some("HYPERTENSION".to_string()), Some(50), 0)
        .unwrap();
    assert_eq!(found.items.len(), 5);
    assert!(found.items.iter().all(|item| item.word_count == 1));
}

#[test]
fn delete_missing_note_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = NoteService::new(SqliteNoteRepository::new(&conn));
    let note = service.create_note("gone", "").unwrap();
    service.delete_note(note.id).unwrap();
    assert_eq!(
        service.delete_note(note.id).unwrap_err(),
        EditorError::NotFound(NotFound::Note(note.id))
    );
    assert_eq!(service.count_notes().unwrap(), 0);
}

#[test]
fn save_creates_unknown_note() {
    let conn = open_db_in_memory().unwrap();
    let mut service = NoteService::new(SqliteNoteRepository::new(&conn));
    let id = uuid::Uuid::new_v4();
    service.save(id, "  ", "<p>imported</p>").unwrap();

    let stored = SqliteNoteRepository::new(&conn).get_note(id).unwrap().unwrap();
    assert_eq!(stored.title, "Untitled Note");
    assert_eq!(service.load().unwrap().len(), 1);
}

//! Note repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist notes as `(uuid, title, content, last_modified)` rows.
//! - Serve ordered, paginated note listings with optional text search.
//!
//! # Invariants
//! - Listing order is `last_modified DESC, uuid ASC`.
//! - Stored `last_modified` never decreases for an existing row; an upsert
//!   carrying a stale timestamp still advances it by one millisecond.

use crate::model::note::{Note, NoteId};
use crate::repo::{like_pattern, normalize_limit, parse_uuid, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const NOTES_DEFAULT_LIMIT: u32 = 50;
const NOTES_LIMIT_MAX: u32 = 500;

const NOTE_SELECT_SQL: &str = "SELECT uuid, title, content, last_modified FROM notes";

/// Query options for note list use-cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteListQuery {
    /// Case-insensitive substring match over title and content.
    pub search: Option<String>,
    /// Maximum rows to return. Defaults to 50 and clamps to 500.
    pub limit: Option<u32>,
    /// Number of rows to skip.
    pub offset: u32,
}

/// Repository interface for note persistence.
pub trait NoteRepository {
    /// Inserts a new note; fails if the id already exists.
    fn insert_note(&self, note: &Note) -> RepoResult<()>;
    /// Inserts or replaces title/content, returning the stored `last_modified`.
    fn upsert_note(&self, note: &Note) -> RepoResult<i64>;
    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>>;
    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>>;
    fn count_notes(&self) -> RepoResult<u64>;
    fn delete_note(&self, id: NoteId) -> RepoResult<()>;
}

/// SQLite-backed note repository.
pub struct SqliteNoteRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNoteRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NoteRepository for SqliteNoteRepository<'_> {
    fn insert_note(&self, note: &Note) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO notes (uuid, title, content, created_at, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?4);",
            params![
                note.id.to_string(),
                note.title,
                note.content,
                note.last_modified
            ],
        )?;
        Ok(())
    }

    fn upsert_note(&self, note: &Note) -> RepoResult<i64> {
        let stored = self.conn.query_row(
            "INSERT INTO notes (uuid, title, content, created_at, last_modified)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT(uuid) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                last_modified = MAX(excluded.last_modified, notes.last_modified + 1)
             RETURNING last_modified;",
            params![
                note.id.to_string(),
                note.title,
                note.content,
                note.last_modified
            ],
            |row| row.get::<_, i64>(0),
        )?;
        Ok(stored)
    }

    fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        let row = self
            .conn
            .query_row(
                &format!("{NOTE_SELECT_SQL} WHERE uuid = ?1;"),
                [id.to_string()],
                read_note_row,
            )
            .optional()?;
        row.map(RawNote::into_note).transpose()
    }

    fn list_notes(&self, query: &NoteListQuery) -> RepoResult<Vec<Note>> {
        let mut sql = String::from(NOTE_SELECT_SQL);
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(term) = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
        {
            sql.push_str(
                " WHERE (title LIKE ?1 ESCAPE '\\' OR content LIKE ?1 ESCAPE '\\')",
            );
            bind_values.push(Value::Text(like_pattern(term)));
        }

        sql.push_str(" ORDER BY last_modified DESC, uuid ASC");
        let limit = normalize_limit(query.limit, NOTES_DEFAULT_LIMIT, NOTES_LIMIT_MAX);
        sql.push_str(&format!(" LIMIT ?{}", bind_values.len() + 1));
        bind_values.push(Value::Integer(i64::from(limit)));
        if query.offset > 0 {
            sql.push_str(&format!(" OFFSET ?{}", bind_values.len() + 1));
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(bind_values), read_note_row)?;
        let mut notes = Vec::new();
        for row in rows {
            notes.push(row?.into_note()?);
        }
        Ok(notes)
    }

    fn count_notes(&self) -> RepoResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM notes;", [], |row| row.get(0))?;
        u64::try_from(count).map_err(|_| RepoError::InvalidData(format!("negative count {count}")))
    }

    fn delete_note(&self, id: NoteId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM notes WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

struct RawNote {
    uuid: String,
    title: String,
    content: String,
    last_modified: i64,
}

impl RawNote {
    fn into_note(self) -> RepoResult<Note> {
        Ok(Note {
            id: parse_uuid(&self.uuid, "notes.uuid")?,
            title: self.title,
            content: self.content,
            last_modified: self.last_modified,
        })
    }
}

fn read_note_row(row: &Row<'_>) -> rusqlite::Result<RawNote> {
    Ok(RawNote {
        uuid: row.get("uuid")?,
        title: row.get("title")?,
        content: row.get("content")?,
        last_modified: row.get("last_modified")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{NoteListQuery, NoteRepository, SqliteNoteRepository};
    use crate::db::open_db_in_memory;
    use crate::model::note::Note;

    #[test]
    fn stale_upsert_still_advances_timestamp() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::new(&conn);
        let mut note = Note::new("Rounds", "<p>bp 120/80</p>", 1_000);
        repo.insert_note(&note).unwrap();

        note.last_modified = 500;
        assert_eq!(repo.upsert_note(&note).unwrap(), 1_001);
        assert_eq!(repo.get_note(note.id).unwrap().unwrap().last_modified, 1_001);
    }

    #[test]
    fn search_matches_title_and_content_case_insensitively() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteNoteRepository::new(&conn);
        repo.insert_note(&Note::new("Cardiology", "", 1)).unwrap();
        repo.insert_note(&Note::new("Misc", "<p>ECG shows AFib</p>", 2))
            .unwrap();
        repo.insert_note(&Note::new("Other", "", 3)).unwrap();

        let query = NoteListQuery {
            search: Some("afib".to_string()),
            ..NoteListQuery::default()
        };
        let found = repo.list_notes(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Misc");
    }
}

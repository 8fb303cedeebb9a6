//! Note use-case service.
//!
//! # Responsibility
//! - Provide note create/rename/update/get/list/delete APIs.
//! - Derive list projections (`preview_text`, `word_count`) from content.
//! - Serve as the SQLite-backed `NotePersistence` collaborator.
//!
//! # Invariants
//! - `update_content` uses full content replacement semantics.
//! - Note list is always sorted by `last_modified DESC, uuid ASC`.
//! - Returned notes carry the `last_modified` value actually stored.

use crate::autosave::NotePersistence;
use crate::content::Document;
use crate::error::{EditorResult, NotFound, ServiceError};
use crate::model::note::{now_epoch_ms, Note, NoteId};
use crate::repo::note_repo::{NoteListQuery, NoteRepository};
use crate::repo::RepoResult;
use log::{info, warn};

/// Row shown in the note picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSummary {
    pub id: NoteId,
    pub title: String,
    pub preview_text: Option<String>,
    pub word_count: usize,
    pub last_modified: i64,
}

impl NoteSummary {
    pub fn from_note(note: &Note) -> Self {
        let document = Document::deserialize(&note.content);
        Self {
            id: note.id,
            title: note.title.clone(),
            preview_text: document.preview_text(),
            word_count: document.word_count(),
            last_modified: note.last_modified,
        }
    }
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesListResult {
    /// Items sorted by `last_modified DESC, uuid ASC`.
    pub items: Vec<NoteSummary>,
    pub offset: u32,
}

/// Note service facade over repository implementations.
pub struct NoteService<R: NoteRepository> {
    repo: R,
    clock: fn() -> i64,
}

impl<R: NoteRepository> NoteService<R> {
    /// Creates a service using the wall clock.
    pub fn new(repo: R) -> Self {
        Self::with_clock(repo, now_epoch_ms)
    }

    /// Creates a service with a caller-provided epoch-ms clock.
    pub fn with_clock(repo: R, clock: fn() -> i64) -> Self {
        Self { repo, clock }
    }

    /// Creates and stores a new note.
    pub fn create_note(&self, title: &str, content: impl Into<String>) -> EditorResult<Note> {
        let note = Note::new(title, content, (self.clock)());
        self.repo.insert_note(&note)?;
        info!("event=note_create module=service status=ok note_id={}", note.id);
        Ok(note)
    }

    /// Renames one note.
    pub fn rename_note(&self, id: NoteId, title: &str) -> EditorResult<Note> {
        let mut note = self.require(id)?;
        note.rename(title, (self.clock)());
        self.store(note)
    }

    /// Replaces the full content of one note.
    pub fn update_content(&self, id: NoteId, content: impl Into<String>) -> EditorResult<Note> {
        let mut note = self.require(id)?;
        note.set_content(content, (self.clock)());
        self.store(note)
    }

    /// Gets one note by stable ID.
    pub fn get_note(&self, id: NoteId) -> RepoResult<Option<Note>> {
        self.repo.get_note(id)
    }

    /// Lists note summaries with optional search and pagination.
    pub fn list_notes(
        &self,
        search: Option<String>,
        limit: Option<u32>,
        offset: u32,
    ) -> EditorResult<NotesListResult> {
        let query = NoteListQuery {
            search,
            limit,
            offset,
        };
        let items = self
            .repo
            .list_notes(&query)?
            .iter()
            .map(NoteSummary::from_note)
            .collect();
        Ok(NotesListResult { items, offset })
    }

    pub fn count_notes(&self) -> RepoResult<u64> {
        self.repo.count_notes()
    }

    pub fn delete_note(&self, id: NoteId) -> EditorResult<()> {
        self.repo.delete_note(id)?;
        info!("event=note_delete module=service status=ok note_id={id}");
        Ok(())
    }

    fn require(&self, id: NoteId) -> EditorResult<Note> {
        self.repo
            .get_note(id)?
            .ok_or_else(|| NotFound::Note(id).into())
    }

    fn store(&self, mut note: Note) -> EditorResult<Note> {
        note.last_modified = self.repo.upsert_note(&note)?;
        Ok(note)
    }
}

impl<R: NoteRepository> NotePersistence for NoteService<R> {
    fn save(&mut self, id: NoteId, title: &str, content: &str) -> Result<(), ServiceError> {
        let note = Note::with_id(id, title, content, (self.clock)());
        match self.repo.upsert_note(&note) {
            Ok(stored) => {
                info!(
                    "event=note_save module=service status=ok note_id={id} last_modified={stored}"
                );
                Ok(())
            }
            Err(err) => {
                warn!("event=note_save module=service status=error note_id={id} error={err}");
                Err(err.into())
            }
        }
    }

    fn load(&mut self) -> Result<Vec<Note>, ServiceError> {
        let total = self.repo.count_notes()?;
        let mut notes = Vec::new();
        let mut offset = 0u32;
        while (notes.len() as u64) < total {
            let page = self.repo.list_notes(&NoteListQuery {
                search: None,
                limit: Some(u32::MAX),
                offset,
            })?;
            if page.is_empty() {
                break;
            }
            offset = offset.saturating_add(u32::try_from(page.len()).unwrap_or(u32::MAX));
            notes.extend(page);
        }
        Ok(notes)
    }
}

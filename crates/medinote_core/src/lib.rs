//! Core domain logic for MediNote.
//! This crate is the single source of truth for note content, image objects,
//! autosave, persistence and assistant bookkeeping.

pub mod ai;
pub mod autosave;
pub mod content;
pub mod db;
pub mod error;
pub mod image;
pub mod logging;
pub mod model;
pub mod pdf;
pub mod repo;
pub mod service;
pub mod settings;
pub mod speech;

pub use autosave::{AutosaveController, AutosavePhase, NotePersistence, SaveTicket};
pub use content::{Document, FormatKind, SelectionRange};
pub use db::{open_db, open_db_in_memory, DbError};
pub use error::{
    EditorError, EditorResult, NotFound, Notice, NoticeLevel, ServiceError, UnsupportedMedia,
    ValidationError,
};
pub use image::{ImageManager, ImageUpload};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::article::{Article, ArticleDraft, ArticleId};
pub use model::image::{ImageId, ImageObject, ImageShape, ResizeDelta, ResizeHandle};
pub use model::note::{Note, NoteId, UNTITLED_NOTE_TITLE};
pub use repo::knowledge_repo::{KnowledgeRepository, SqliteKnowledgeRepository};
pub use repo::note_repo::{NoteRepository, SqliteNoteRepository};
pub use repo::{RepoError, RepoResult};
pub use service::editor_session::NoteSession;
pub use service::knowledge_service::{ArticleFilter, KnowledgeService};
pub use service::note_service::{NoteService, NoteSummary};
pub use settings::{load_settings, Settings};
pub use speech::{PlaybackStatus, SpeechEngine, SpeechPlayer, SpeechSegment};

/// Minimal health-check API for host integration.
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

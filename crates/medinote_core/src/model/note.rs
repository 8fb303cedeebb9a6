//! Note domain record.
//!
//! # Responsibility
//! - Define the canonical note shape shared by editor, storage and publishing.
//! - Own the `last_modified` monotonic clock rule.
//!
//! # Invariants
//! - `id` is stable and never reused for another note.
//! - `last_modified` strictly increases on every committed mutation.
//! - `title` is never blank; blank input becomes `UNTITLED_NOTE_TITLE`.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Stable identifier for a note.
pub type NoteId = Uuid;

/// Title assigned to notes created without one.
pub const UNTITLED_NOTE_TITLE: &str = "Untitled Note";

/// One note: a title plus a serialized content buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Serialized block tree, see `content::Document::serialize`.
    pub content: String,
    /// Unix epoch milliseconds of the last committed mutation.
    pub last_modified: i64,
}

impl Note {
    /// Creates a note with a generated stable ID.
    pub fn new(title: &str, content: impl Into<String>, now_ms: i64) -> Self {
        Self::with_id(Uuid::new_v4(), title, content, now_ms)
    }

    /// Creates a note with a caller-provided ID (import and load paths).
    pub fn with_id(id: NoteId, title: &str, content: impl Into<String>, now_ms: i64) -> Self {
        Self {
            id,
            title: normalize_title(title),
            content: content.into(),
            last_modified: now_ms,
        }
    }

    /// Advances `last_modified`, returning the committed value.
    ///
    /// A clock that stands still or runs backwards still yields a strictly
    /// larger value than the previous one.
    pub fn touch(&mut self, now_ms: i64) -> i64 {
        self.last_modified = now_ms.max(self.last_modified.saturating_add(1));
        self.last_modified
    }

    /// Renames the note and commits the mutation.
    pub fn rename(&mut self, title: &str, now_ms: i64) {
        self.title = normalize_title(title);
        self.touch(now_ms);
    }

    /// Replaces the content buffer and commits the mutation.
    pub fn set_content(&mut self, content: impl Into<String>, now_ms: i64) {
        self.content = content.into();
        self.touch(now_ms);
    }
}

/// Trims a title, falling back to the untitled placeholder.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        UNTITLED_NOTE_TITLE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Current wall clock in unix epoch milliseconds.
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

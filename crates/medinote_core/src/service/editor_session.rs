//! Editing session for one open note.
//!
//! # Responsibility
//! - Bind a `Note`, its parsed `Document`, the image manager and the
//!   autosave controller into one explicitly passed context.
//! - Commit every successful edit: re-serialize, touch, arm autosave.
//!
//! # Invariants
//! - `note.content` always equals `document.serialize()` after an edit.
//! - Rejected edits leave note, document and autosave untouched.
//! - The cursor is a caret; insertions land at it and move it past the
//!   inserted content.

use crate::autosave::{AutosaveController, AutosavePhase, NotePersistence};
use crate::content::{Caret, Document, FormatKind, SelectionRange};
use crate::error::{EditorResult, ServiceError};
use crate::image::{ImageManager, ImageUpload};
use crate::model::image::{ImageId, ImageShape, ResizeDelta, ResizeHandle};
use crate::model::note::{now_epoch_ms, Note};
use crate::settings::Settings;
use log::debug;
use std::time::Instant;

/// Open note plus the editor state around it.
pub struct NoteSession {
    note: Note,
    document: Document,
    images: ImageManager,
    autosave: AutosaveController,
    cursor: Option<Caret>,
    clock: fn() -> i64,
}

impl NoteSession {
    /// Opens `note` using the wall clock for `last_modified`.
    pub fn open(note: Note, settings: &Settings) -> Self {
        Self::open_with_clock(note, settings, now_epoch_ms)
    }

    pub fn open_with_clock(note: Note, settings: &Settings, clock: fn() -> i64) -> Self {
        let document = Document::deserialize(&note.content);
        debug!(
            "event=session_open module=session status=ok note_id={} blocks={}",
            note.id,
            document.blocks().len()
        );
        Self {
            note,
            document,
            images: ImageManager::new(settings.images.clone()),
            autosave: AutosaveController::new(&settings.autosave),
            cursor: None,
            clock,
        }
    }

    pub fn note(&self) -> &Note {
        &self.note
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn images(&self) -> &ImageManager {
        &self.images
    }

    pub fn autosave(&self) -> &AutosaveController {
        &self.autosave
    }

    pub fn autosave_mut(&mut self) -> &mut AutosaveController {
        &mut self.autosave
    }

    pub fn autosave_phase(&self) -> AutosavePhase {
        self.autosave.phase()
    }

    /// Block holding the cursor.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor.map(|caret| caret.block)
    }

    pub fn caret(&self) -> Option<Caret> {
        self.cursor
    }

    /// Places the cursor after block `block`; `None` means end of document.
    pub fn set_cursor(&mut self, block: Option<usize>) {
        let last = self.document.blocks().len().saturating_sub(1);
        self.cursor = block.map(|index| Caret::after_block(index.min(last)));
    }

    pub fn rename(&mut self, title: &str, now: Instant) {
        self.note.rename(title, (self.clock)());
        self.autosave.notify_change(now);
    }

    /// Replaces the body with content typed on the editing surface.
    pub fn replace_content(&mut self, buffer: &str, now: Instant) {
        self.document = Document::deserialize(buffer);
        if self
            .images
            .selected()
            .is_some_and(|id| self.document.image(id).is_none())
        {
            self.images.clear_selection();
        }
        self.set_cursor(self.cursor());
        self.commit(now);
    }

    pub fn apply_format(
        &mut self,
        range: SelectionRange,
        kind: &FormatKind,
        now: Instant,
    ) -> EditorResult<()> {
        self.document.apply_format(range, kind)?;
        self.commit(now);
        Ok(())
    }

    /// Inserts text or markup at the cursor, or at the end.
    pub fn insert_content(&mut self, payload: &str, is_structured: bool, now: Instant) {
        let end = self
            .document
            .insert_content_at(self.cursor, payload, is_structured);
        if self.cursor.is_some() {
            self.cursor = end;
        }
        self.commit(now);
    }

    pub fn insert_image(&mut self, upload: &ImageUpload, now: Instant) -> EditorResult<ImageId> {
        let after = self.cursor();
        let id = self.images.insert(&mut self.document, upload, after)?;
        if self.cursor.is_some() {
            self.cursor = self.document.image_position(id).map(Caret::after_block);
        }
        self.commit(now);
        Ok(id)
    }

    pub fn select_image(&mut self, id: ImageId) -> EditorResult<()> {
        self.images.select(&self.document, id)
    }

    pub fn clear_image_selection(&mut self) {
        self.images.clear_selection();
    }

    pub fn resize_image(
        &mut self,
        id: ImageId,
        handle: ResizeHandle,
        delta: ResizeDelta,
        free: bool,
        now: Instant,
    ) -> EditorResult<()> {
        self.images
            .resize(&mut self.document, id, handle, delta, free)?;
        self.commit(now);
        Ok(())
    }

    pub fn rotate_image(&mut self, id: ImageId, now: Instant) -> EditorResult<()> {
        self.images.rotate(&mut self.document, id)?;
        self.commit(now);
        Ok(())
    }

    pub fn reshape_image(&mut self, id: ImageId, shape: ImageShape, now: Instant) -> EditorResult<()> {
        self.images.reshape(&mut self.document, id, shape)?;
        self.commit(now);
        Ok(())
    }

    pub fn set_image_caption(&mut self, id: ImageId, caption: &str, now: Instant) -> EditorResult<()> {
        self.images.set_caption(&mut self.document, id, caption)?;
        self.commit(now);
        Ok(())
    }

    pub fn duplicate_image(&mut self, id: ImageId, now: Instant) -> EditorResult<ImageId> {
        let copy = self.images.duplicate(&mut self.document, id)?;
        self.commit(now);
        Ok(copy)
    }

    pub fn delete_image(&mut self, id: ImageId, now: Instant) -> EditorResult<()> {
        self.images.delete(&mut self.document, id)?;
        self.set_cursor(self.cursor());
        self.commit(now);
        Ok(())
    }

    pub fn reorder_image(&mut self, id: ImageId, target: usize, now: Instant) -> EditorResult<usize> {
        let position = self.images.reorder(&mut self.document, id, target)?;
        self.commit(now);
        Ok(position)
    }

    /// Saves through `store` once the debounce deadline has passed.
    pub fn tick<P>(&mut self, now: Instant, store: &mut P) -> Option<Result<(), ServiceError>>
    where
        P: NotePersistence + ?Sized,
    {
        self.autosave.tick(now, &self.note, store)
    }

    /// Saves a pending change immediately.
    pub fn flush<P>(&mut self, now: Instant, store: &mut P) -> Option<Result<(), ServiceError>>
    where
        P: NotePersistence + ?Sized,
    {
        self.autosave.flush(now, &self.note, store)
    }

    /// Flushes pending changes and hands the note back.
    pub fn close<P>(mut self, now: Instant, store: &mut P) -> Result<Note, ServiceError>
    where
        P: NotePersistence + ?Sized,
    {
        if let Some(result) = self.flush(now, store) {
            result?;
        }
        Ok(self.note)
    }

    fn commit(&mut self, now: Instant) {
        let content = self.document.serialize();
        self.note.set_content(content, (self.clock)());
        self.autosave.notify_change(now);
    }
}

#[cfg(test)]
mod tests {
    use super::NoteSession;
    use crate::autosave::AutosavePhase;
    use crate::content::{FormatKind, SelectionRange};
    use crate::error::{EditorError, ValidationError};
    use crate::model::note::Note;
    use crate::settings::Settings;
    use std::time::Instant;

    fn clock() -> i64 {
        5
    }

    #[test]
    fn successful_edit_commits_and_arms_autosave() {
        let note = Note::new("Rounds", "hello", 5);
        let mut session = NoteSession::open_with_clock(note, &Settings::default(), clock);
        session
            .apply_format(SelectionRange::new(0, 5), &FormatKind::Bold, Instant::now())
            .unwrap();
        assert_eq!(session.note().content, "<strong>hello</strong>");
        assert_eq!(session.note().last_modified, 6);
        assert_eq!(session.autosave_phase(), AutosavePhase::PendingSave);
    }

    #[test]
    fn rejected_edit_leaves_note_untouched() {
        let note = Note::new("Rounds", "hello", 5);
        let mut session = NoteSession::open_with_clock(note.clone(), &Settings::default(), clock);
        let err = session
            .apply_format(SelectionRange::new(2, 2), &FormatKind::Bold, Instant::now())
            .unwrap_err();
        assert_eq!(err, EditorError::Validation(ValidationError::EmptySelection));
        assert_eq!(session.note(), &note);
        assert_eq!(session.autosave_phase(), AutosavePhase::Idle);
    }

    #[test]
    fn insert_at_cursor_lands_after_cursor_block() {
        let note = Note::new("Rounds", "<p>a</p><p>b</p>", 5);
        let mut session = NoteSession::open_with_clock(note, &Settings::default(), clock);
        session.set_cursor(Some(0));
        session.insert_content("<p>x</p>", true, Instant::now());
        assert_eq!(session.note().content, "<p>a</p><br><br><p>x</p><p>b</p>");
        assert_eq!(session.cursor(), Some(2));
    }

    #[test]
    fn successive_inserts_before_text_run_stay_in_order() {
        let note = Note::new("Rounds", "<p>p</p>tail", 5);
        let mut session = NoteSession::open_with_clock(note, &Settings::default(), clock);
        session.set_cursor(Some(0));
        session.insert_content("one", false, Instant::now());
        session.insert_content("two", false, Instant::now());
        assert_eq!(
            session.note().content,
            "<p>p</p><br><br>one<br><br>two<br><br>tail"
        );
        assert_eq!(session.cursor(), Some(1));
    }
}

//! Debounced autosave.
//!
//! # Responsibility
//! - Collapse bursts of content mutations into one persistence call.
//! - Keep at most one save in flight and remember changes made during it.
//!
//! # Invariants
//! - States are exactly `Idle`, `PendingSave` and `Saving`.
//! - Every change re-arms the deadline to `now + interval`.
//! - A failed save is reported to the caller and the controller still
//!   returns to `Idle` (or `PendingSave` when a change was queued).
//! - Time is always supplied by the caller; the controller never reads a
//!   clock and never blocks.

use crate::error::ServiceError;
use crate::model::note::{Note, NoteId};
use crate::settings::{AutosaveSettings, MIN_AUTOSAVE_INTERVAL_MS};
use log::{debug, warn};
use std::time::{Duration, Instant};

/// Persistence collaborator that receives autosaved notes.
pub trait NotePersistence {
    /// Stores the latest title and content of one note.
    fn save(&mut self, id: NoteId, title: &str, content: &str) -> Result<(), ServiceError>;
    /// Returns every stored note.
    fn load(&mut self) -> Result<Vec<Note>, ServiceError>;
}

/// Observable autosave state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutosavePhase {
    Idle,
    PendingSave,
    Saving,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    PendingSave { deadline: Instant },
    Saving { queued: bool },
}

/// Handle for one in-flight save, returned by `AutosaveController::poll`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveTicket {
    generation: u64,
}

/// Debounce state machine driven by the host event loop.
#[derive(Debug, Clone)]
pub struct AutosaveController {
    enabled: bool,
    interval: Duration,
    state: State,
    generation: u64,
}

impl AutosaveController {
    pub fn new(settings: &AutosaveSettings) -> Self {
        Self {
            enabled: settings.enabled,
            interval: settings
                .interval()
                .max(Duration::from_millis(MIN_AUTOSAVE_INTERVAL_MS)),
            state: State::Idle,
            generation: 0,
        }
    }

    pub fn phase(&self) -> AutosavePhase {
        match self.state {
            State::Idle => AutosavePhase::Idle,
            State::PendingSave { .. } => AutosavePhase::PendingSave,
            State::Saving { .. } => AutosavePhase::Saving,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// When the pending save becomes due, if one is armed.
    pub fn next_deadline(&self) -> Option<Instant> {
        match self.state {
            State::PendingSave { deadline } => Some(deadline),
            State::Idle | State::Saving { .. } => None,
        }
    }

    /// Records a content mutation at `now`.
    pub fn notify_change(&mut self, now: Instant) {
        if !self.enabled {
            return;
        }
        self.state = match self.state {
            State::Idle | State::PendingSave { .. } => State::PendingSave {
                deadline: now + self.interval,
            },
            State::Saving { .. } => State::Saving { queued: true },
        };
    }

    /// Starts a save once the deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<SaveTicket> {
        match self.state {
            State::PendingSave { deadline } if now >= deadline => Some(self.begin_save()),
            _ => None,
        }
    }

    /// Finishes the save identified by `ticket` and passes `result` through.
    ///
    /// Tickets from an earlier save are ignored.
    pub fn complete(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), ServiceError>,
        now: Instant,
    ) -> Result<(), ServiceError> {
        let State::Saving { queued } = self.state else {
            return result;
        };
        if ticket.generation != self.generation {
            return result;
        }

        match &result {
            Ok(()) => debug!(
                "event=autosave module=autosave status=ok generation={} queued={queued}",
                ticket.generation
            ),
            Err(err) => warn!(
                "event=autosave module=autosave status=error generation={} error={}",
                ticket.generation, err
            ),
        }
        self.state = if queued && self.enabled {
            State::PendingSave {
                deadline: now + self.interval,
            }
        } else {
            State::Idle
        };
        result
    }

    /// Runs one debounce step: saves `note` when the deadline has passed.
    ///
    /// Returns `None` when no save was due.
    pub fn tick<P>(
        &mut self,
        now: Instant,
        note: &Note,
        store: &mut P,
    ) -> Option<Result<(), ServiceError>>
    where
        P: NotePersistence + ?Sized,
    {
        let ticket = self.poll(now)?;
        let result = store.save(note.id, &note.title, &note.content);
        Some(self.complete(ticket, result, now))
    }

    /// Saves immediately if a change is pending, ignoring the deadline.
    pub fn flush<P>(
        &mut self,
        now: Instant,
        note: &Note,
        store: &mut P,
    ) -> Option<Result<(), ServiceError>>
    where
        P: NotePersistence + ?Sized,
    {
        if !matches!(self.state, State::PendingSave { .. }) {
            return None;
        }
        let ticket = self.begin_save();
        let result = store.save(note.id, &note.title, &note.content);
        Some(self.complete(ticket, result, now))
    }

    /// Turns autosave on or off; disabling drops any armed deadline.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if enabled {
            return;
        }
        self.state = match self.state {
            State::Idle | State::PendingSave { .. } => State::Idle,
            State::Saving { .. } => State::Saving { queued: false },
        };
    }

    /// Changes the debounce interval for subsequently armed deadlines.
    ///
    /// Values below `MIN_AUTOSAVE_INTERVAL_MS` are raised to it.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval.max(Duration::from_millis(MIN_AUTOSAVE_INTERVAL_MS));
    }

    fn begin_save(&mut self) -> SaveTicket {
        self.generation += 1;
        self.state = State::Saving { queued: false };
        debug!(
            "event=autosave module=autosave status=start generation={}",
            self.generation
        );
        SaveTicket {
            generation: self.generation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AutosaveController, AutosavePhase, NotePersistence};
    use crate::error::ServiceError;
    use crate::model::note::{Note, NoteId};
    use crate::settings::{AutosaveSettings, MIN_AUTOSAVE_INTERVAL_MS};
    use std::time::{Duration, Instant};

    #[derive(Default)]
    struct Recorder {
        saved: Vec<(NoteId, String)>,
        fail: bool,
    }

    impl NotePersistence for Recorder {
        fn save(&mut self, id: NoteId, _title: &str, content: &str) -> Result<(), ServiceError> {
            if self.fail {
                return Err(ServiceError::Storage("disk full".to_string()));
            }
            self.saved.push((id, content.to_string()));
            Ok(())
        }

        fn load(&mut self) -> Result<Vec<Note>, ServiceError> {
            Ok(Vec::new())
        }
    }

    fn controller() -> AutosaveController {
        AutosaveController::new(&AutosaveSettings::default())
    }

    #[test]
    fn change_arms_deadline_from_latest_mutation() {
        let start = Instant::now();
        let mut autosave = controller();
        autosave.notify_change(start);
        autosave.notify_change(start + Duration::from_millis(500));
        assert_eq!(
            autosave.next_deadline(),
            Some(start + Duration::from_millis(2_500))
        );
        assert!(autosave.poll(start + Duration::from_millis(2_000)).is_none());
        assert!(autosave.poll(start + Duration::from_millis(2_500)).is_some());
        assert_eq!(autosave.phase(), AutosavePhase::Saving);
    }

    #[test]
    fn change_during_save_is_queued() {
        let start = Instant::now();
        let mut autosave = controller();
        autosave.notify_change(start);
        let ticket = autosave.poll(start + Duration::from_secs(2)).unwrap();
        autosave.notify_change(start + Duration::from_millis(2_100));
        assert_eq!(autosave.phase(), AutosavePhase::Saving);

        let done = start + Duration::from_millis(2_200);
        autosave.complete(ticket, Ok(()), done).unwrap();
        assert_eq!(autosave.next_deadline(), Some(done + Duration::from_secs(2)));
    }

    #[test]
    fn failed_save_returns_to_idle_and_reports() {
        let start = Instant::now();
        let mut autosave = controller();
        let note = Note::new("n", "c", 0);
        let mut store = Recorder {
            fail: true,
            ..Recorder::default()
        };
        autosave.notify_change(start);
        let result = autosave.tick(start + Duration::from_secs(3), &note, &mut store);
        assert!(matches!(result, Some(Err(ServiceError::Storage(_)))));
        assert_eq!(autosave.phase(), AutosavePhase::Idle);
    }

    #[test]
    fn disabled_controller_never_saves() {
        let start = Instant::now();
        let mut autosave = controller();
        autosave.notify_change(start);
        autosave.set_enabled(false);
        assert_eq!(autosave.phase(), AutosavePhase::Idle);
        autosave.notify_change(start);
        let mut store = Recorder::default();
        let note = Note::new("n", "c", 0);
        assert!(autosave
            .tick(start + Duration::from_secs(10), &note, &mut store)
            .is_none());
        assert!(store.saved.is_empty());
    }

    #[test]
    fn flush_saves_pending_change_immediately() {
        let start = Instant::now();
        let mut autosave = controller();
        let note = Note::new("n", "body", 0);
        let mut store = Recorder::default();
        assert!(autosave.flush(start, &note, &mut store).is_none());
        autosave.notify_change(start);
        assert!(matches!(
            autosave.flush(start, &note, &mut store),
            Some(Ok(()))
        ));
        assert_eq!(store.saved, vec![(note.id, "body".to_string())]);
    }

    #[test]
    fn interval_is_floored_at_minimum() {
        let mut autosave = controller();
        autosave.set_interval(Duration::ZERO);
        assert_eq!(autosave.interval(), Duration::from_millis(100));
        autosave.set_interval(Duration::from_millis(750));
        assert_eq!(autosave.interval(), Duration::from_millis(750));
    }
}

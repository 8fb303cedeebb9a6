//! Speech playback control over an ordered list of speaker segments.
//!
//! # Responsibility
//! - Own the segment list and the playback cursor.
//! - Drive a `SpeechEngine` collaborator and notify subscribers of every
//!   state change.
//!
//! # Invariants
//! - `index < segments.len()` whenever segments are loaded.
//! - Only one segment is handed to the engine at a time.
//! - A failing engine leaves the player `Stopped`, never stuck `Playing`.

use crate::error::{EditorError, EditorResult, NotFound, ServiceError};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// One spoken line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechSegment {
    pub speaker: String,
    pub text: String,
}

impl SpeechSegment {
    pub fn new(speaker: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
        }
    }
}

/// Text-to-speech collaborator.
pub trait SpeechEngine {
    /// Starts speaking `segment`, replacing any current utterance.
    fn speak(&mut self, segment: &SpeechSegment) -> Result<(), ServiceError>;
    fn pause(&mut self) -> Result<(), ServiceError>;
    fn resume(&mut self) -> Result<(), ServiceError>;
    /// Silences the engine; never fails.
    fn cancel(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    Stopped,
    Playing,
    Paused,
    Finished,
}

/// State broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackState {
    pub status: PlaybackStatus,
    pub index: usize,
    pub total: usize,
}

/// Handle returned by `SpeechPlayer::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&PlaybackState)>;

pub struct SpeechPlayer<E: SpeechEngine> {
    engine: E,
    segments: Vec<SpeechSegment>,
    index: usize,
    status: PlaybackStatus,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<E: SpeechEngine> SpeechPlayer<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            segments: Vec::new(),
            index: 0,
            status: PlaybackStatus::Stopped,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn segments(&self) -> &[SpeechSegment] {
        &self.segments
    }

    pub fn current(&self) -> Option<&SpeechSegment> {
        self.segments.get(self.index)
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            status: self.status,
            index: self.index,
            total: self.segments.len(),
        }
    }

    /// Registers a state-change listener.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&PlaybackState) + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(current, _)| *current != id);
    }

    /// Replaces the segment list and rewinds.
    pub fn load(&mut self, segments: Vec<SpeechSegment>) {
        self.engine.cancel();
        self.segments = segments;
        self.index = 0;
        self.status = PlaybackStatus::Stopped;
        debug!(
            "event=speech_load module=speech status=ok segments={}",
            self.segments.len()
        );
        self.notify();
    }

    /// Starts, resumes or restarts playback.
    pub fn play(&mut self) -> EditorResult<()> {
        match self.status {
            PlaybackStatus::Playing => Ok(()),
            PlaybackStatus::Paused => {
                self.engine.resume().map_err(|err| self.fail(err))?;
                self.set_status(PlaybackStatus::Playing);
                Ok(())
            }
            PlaybackStatus::Stopped | PlaybackStatus::Finished => {
                if self.status == PlaybackStatus::Finished {
                    self.index = 0;
                }
                self.speak_current()
            }
        }
    }

    pub fn pause(&mut self) -> EditorResult<()> {
        if self.status != PlaybackStatus::Playing {
            return Ok(());
        }
        self.engine.pause().map_err(|err| self.fail(err))?;
        self.set_status(PlaybackStatus::Paused);
        Ok(())
    }

    /// Stops playback and rewinds to the first segment.
    pub fn stop(&mut self) {
        self.engine.cancel();
        self.index = 0;
        self.set_status(PlaybackStatus::Stopped);
    }

    /// Skips to the next segment, finishing after the last one.
    pub fn next(&mut self) -> EditorResult<()> {
        if self.index + 1 < self.segments.len() {
            self.jump(self.index + 1)
        } else {
            self.finish();
            Ok(())
        }
    }

    pub fn previous(&mut self) -> EditorResult<()> {
        if self.segments.is_empty() {
            return Err(NotFound::Segment(0).into());
        }
        self.jump(self.index.saturating_sub(1))
    }

    /// Plays segment `index`.
    pub fn jump(&mut self, index: usize) -> EditorResult<()> {
        if index >= self.segments.len() {
            return Err(NotFound::Segment(index).into());
        }
        self.engine.cancel();
        self.index = index;
        self.speak_current()
    }

    /// Engine callback: the current utterance ended on its own.
    pub fn segment_finished(&mut self) -> EditorResult<()> {
        if self.status != PlaybackStatus::Playing {
            return Ok(());
        }
        if self.index + 1 < self.segments.len() {
            self.index += 1;
            self.speak_current()
        } else {
            self.finish();
            Ok(())
        }
    }

    fn speak_current(&mut self) -> EditorResult<()> {
        let Some(segment) = self.segments.get(self.index) else {
            return Err(NotFound::Segment(self.index).into());
        };
        self.engine.speak(segment).map_err(|err| self.fail(err))?;
        self.set_status(PlaybackStatus::Playing);
        Ok(())
    }

    fn finish(&mut self) {
        self.engine.cancel();
        self.set_status(PlaybackStatus::Finished);
    }

    fn fail(&mut self, err: ServiceError) -> EditorError {
        warn!(
            "event=speech_engine module=speech status=error index={} error={}",
            self.index, err
        );
        self.engine.cancel();
        self.set_status(PlaybackStatus::Stopped);
        err.into()
    }

    fn set_status(&mut self, status: PlaybackStatus) {
        self.status = status;
        self.notify();
    }

    fn notify(&mut self) {
        let state = self.state();
        for (_, listener) in &mut self.listeners {
            listener(&state);
        }
    }
}

//! Playback session
//!
//! A session walks the document from a start line to the end, speaking one
//! line at a time: sanitize, render, play, pause, next. Exactly one utterance
//! is in flight at any moment because there is exactly one loop.
//!
//! The session record (state, current line, cancel flag) sits behind one
//! mutex. Every access is a short critical section; the lock is never held
//! while the renderer or player runs, so `request_cancel` and `status` from
//! other threads always get through promptly.
//!
//! Cancellation is cooperative. It is checked before each line starts and
//! after each line finishes playing, so an utterance that has started is
//! never cut short by a cancel request alone.

use super::events::{Activity, ErrorKind, EventSink, PlaybackEvent};
use crate::document::Document;
use crate::sanitize::sanitize;
use crate::speech::{AudioPlayer, SpeechRenderer, VoiceParams};
use crate::ReaderError;
use log::{debug, error, info, warn};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Lifecycle of one session
///
/// `Idle -> Running -> Finished | Cancelled | Failed`. The last three are
/// terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Finished,
    Cancelled,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            SessionState::Finished | SessionState::Cancelled | SessionState::Failed
        )
    }

    pub fn activity(self) -> Activity {
        match self {
            SessionState::Running => Activity::Running,
            _ => Activity::Idle,
        }
    }

    /// The state after moving to `next`, or `None` if the move is not allowed
    pub fn transition(self, next: SessionState) -> Option<SessionState> {
        use SessionState::*;
        match (self, next) {
            (Idle, Running) => Some(Running),
            (Running, Finished | Cancelled | Failed) => Some(next),
            _ => None,
        }
    }
}

/// Snapshot returned by `status()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub activity: Activity,
    pub state: SessionState,

    /// Line most recently announced with a cursor event
    pub current_index: Option<usize>,
}

impl SessionStatus {
    pub fn idle() -> Self {
        Self {
            activity: Activity::Idle,
            state: SessionState::Idle,
            current_index: None,
        }
    }
}

#[derive(Debug)]
struct SessionRecord {
    state: SessionState,
    current_index: Option<usize>,
    cancel_requested: bool,
}

type SharedRecord = Arc<Mutex<SessionRecord>>;

fn lock(record: &SharedRecord) -> MutexGuard<'_, SessionRecord> {
    record.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheap, cloneable access to a session from other threads
#[derive(Clone)]
pub struct SessionHandle {
    record: SharedRecord,
}

impl SessionHandle {
    /// Ask the session to stop at its next checkpoint
    ///
    /// Never waits for the in-flight utterance.
    pub fn request_cancel(&self) {
        let mut record = lock(&self.record);
        if !record.state.is_terminal() {
            record.cancel_requested = true;
        }
    }

    pub fn status(&self) -> SessionStatus {
        let record = lock(&self.record);
        SessionStatus {
            activity: record.state.activity(),
            state: record.state,
            current_index: record.current_index,
        }
    }

    pub fn state(&self) -> SessionState {
        lock(&self.record).state
    }

    pub fn is_running(&self) -> bool {
        self.state() == SessionState::Running
    }

    /// Record a failure observed from outside the loop (e.g. a panicked thread)
    pub(crate) fn mark_failed(&self) {
        let mut record = lock(&self.record);
        if let Some(next) = record.state.transition(SessionState::Failed) {
            record.state = next;
        }
    }
}

/// One run of the playback loop
pub struct PlaybackSession {
    document: Arc<Document>,
    renderer: Arc<dyn SpeechRenderer>,
    player: Arc<dyn AudioPlayer>,
    events: Arc<dyn EventSink>,
    line_pause: Duration,
    record: SharedRecord,

    /// Called once the session has ended and its last event has gone out
    on_settled: Option<Box<dyn FnOnce() + Send>>,
}

impl PlaybackSession {
    pub fn new(
        document: Arc<Document>,
        renderer: Arc<dyn SpeechRenderer>,
        player: Arc<dyn AudioPlayer>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            document,
            renderer,
            player,
            events,
            line_pause: Duration::from_millis(crate::config::DEFAULT_LINE_PAUSE_MS),
            record: Arc::new(Mutex::new(SessionRecord {
                state: SessionState::Idle,
                current_index: None,
                cancel_requested: false,
            })),
            on_settled: None,
        }
    }

    /// Pause after each spoken line
    pub fn with_line_pause(mut self, pause: Duration) -> Self {
        self.line_pause = pause;
        self
    }

    pub fn on_settled(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_settled = Some(Box::new(f));
        self
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            record: Arc::clone(&self.record),
        }
    }

    /// Start reading at `from_index` and block until the session ends
    ///
    /// Returns the terminal state. A start index past the end of the
    /// document finishes immediately.
    pub fn run(mut self, from_index: usize, params: &VoiceParams) -> SessionState {
        if !self.transition(SessionState::Running) {
            warn!("Session already used; refusing to start again");
            return self.handle().state();
        }
        info!(
            "Playback started at line {} of {} (voice {:?}, {} wpm)",
            from_index,
            self.document.len(),
            params.voice,
            params.rate_wpm
        );
        self.events.emit(PlaybackEvent::StatusChanged {
            activity: Activity::Running,
        });

        let end = self.document.len();
        if from_index > end {
            warn!("Start line {} is past the end ({}); nothing to read", from_index, end);
        }

        let outcome = self.read_lines(from_index.min(end), params);
        self.transition(outcome);
        info!("Playback ended: {:?}", outcome);

        if outcome == SessionState::Finished {
            self.events.emit(PlaybackEvent::Finished);
        }
        self.events.emit(PlaybackEvent::StatusChanged {
            activity: Activity::Idle,
        });

        // Last: nothing from this session may follow a newer session's events
        if let Some(settled) = self.on_settled.take() {
            settled();
        }
        outcome
    }

    fn read_lines(&self, start: usize, params: &VoiceParams) -> SessionState {
        for (index, raw) in self.document.lines().iter().enumerate().skip(start) {
            // Checkpoint A
            if self.cancel_requested() {
                debug!("Cancelled before line {}", index);
                return SessionState::Cancelled;
            }

            if raw.trim().is_empty() {
                continue;
            }

            let utterance = sanitize(raw);
            if utterance.is_empty() {
                debug!("Line {} has nothing to speak", index);
                continue;
            }

            self.set_current(index);
            self.events.emit(PlaybackEvent::CursorMoved { line: index });

            let artifact = match self.renderer.render(&utterance, params) {
                Ok(artifact) => artifact,
                Err(e) => match self.line_failed(index, ErrorKind::Synthesis, e) {
                    Some(outcome) => return outcome,
                    None => continue,
                },
            };

            let played = self.player.play(&artifact);
            artifact.discard();
            if let Err(e) = played {
                match self.line_failed(index, ErrorKind::Playback, e) {
                    Some(outcome) => return outcome,
                    None => continue,
                }
            }

            // Checkpoint B
            if self.cancel_requested() {
                debug!("Cancelled after line {}", index);
                return SessionState::Cancelled;
            }

            if !self.line_pause.is_zero() {
                std::thread::sleep(self.line_pause);
            }
        }

        SessionState::Finished
    }

    /// Handle a render/play failure
    ///
    /// Returns the terminal state if the session must end, `None` to carry
    /// on with the next line.
    fn line_failed(&self, index: usize, kind: ErrorKind, err: ReaderError) -> Option<SessionState> {
        if self.cancel_requested() {
            debug!("Line {} interrupted by stop: {}", index, err);
            return Some(SessionState::Cancelled);
        }

        if !err.is_line_error() {
            error!("Playback failed on line {}: {}", index, err);
            self.events.emit(PlaybackEvent::Error {
                kind: ErrorKind::Session,
                line: index,
                message: err.to_string(),
            });
            return Some(SessionState::Failed);
        }

        warn!("Skipping line {}: {}", index, err);
        self.events.emit(PlaybackEvent::Error {
            kind,
            line: index,
            message: err.to_string(),
        });
        None
    }

    fn transition(&self, next: SessionState) -> bool {
        let mut record = lock(&self.record);
        match record.state.transition(next) {
            Some(state) => {
                record.state = state;
                true
            }
            None => false,
        }
    }

    fn cancel_requested(&self) -> bool {
        lock(&self.record).cancel_requested
    }

    fn set_current(&self, index: usize) {
        lock(&self.record).current_index = Some(index);
    }
}

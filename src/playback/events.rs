//! UI-facing playback events
//!
//! Events are advisory: a UI may use them to move a highlight or show an
//! error, and may ignore them entirely.

use serde::Serialize;
use std::sync::mpsc::Sender;
use std::sync::{Mutex, PoisonError};

/// Coarse playback activity shown to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    Idle,
    Running,
}

/// What went wrong on a line (or with the whole session)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Synthesis,
    Playback,
    /// Unrecoverable; the session has failed
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    /// About to speak this line
    CursorMoved { line: usize },

    StatusChanged { activity: Activity },

    /// Reached the end of the document
    Finished,

    Error {
        kind: ErrorKind,
        line: usize,
        message: String,
    },
}

/// Receiver of playback events
///
/// Called from the playback thread; implementations must not block for long.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: PlaybackEvent);
}

impl<F> EventSink for F
where
    F: Fn(PlaybackEvent) + Send + Sync,
{
    fn emit(&self, event: PlaybackEvent) {
        self(event)
    }
}

/// Forwards events into an mpsc channel
pub struct ChannelSink {
    tx: Mutex<Sender<PlaybackEvent>>,
}

impl ChannelSink {
    pub fn new(tx: Sender<PlaybackEvent>) -> Self {
        Self { tx: Mutex::new(tx) }
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: PlaybackEvent) {
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        // A dropped receiver just means nobody is listening any more
        let _ = tx.send(event);
    }
}

/// Discards every event
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: PlaybackEvent) {}
}

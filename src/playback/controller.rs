//! Playback controller
//!
//! The controller is the single owner of "which session, if any, is
//! playing". `start` claims the active flag with a compare-and-swap and
//! refuses to queue behind a running session. `stop` only flips flags (and
//! optionally signals the speech processes), so it returns immediately even
//! in the middle of a long utterance.

use super::events::EventSink;
use super::session::{PlaybackSession, SessionHandle, SessionState, SessionStatus};
use crate::document::Document;
use crate::speech::{AudioPlayer, Backend, ProcessRegistry, SpeechRenderer, VoiceParams};
use crate::{ReaderError, Result};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Clears the active flag when dropped, including on panic
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

struct CurrentSession {
    handle: SessionHandle,
    thread: Option<JoinHandle<SessionState>>,
}

pub struct PlaybackController {
    renderer: Arc<dyn SpeechRenderer>,
    player: Arc<dyn AudioPlayer>,
    events: Arc<dyn EventSink>,
    line_pause: Duration,

    /// Processes to kill on stop; `None` keeps stop purely cooperative
    hard_kill: Option<ProcessRegistry>,

    active: Arc<AtomicBool>,
    current: Mutex<Option<CurrentSession>>,
}

impl PlaybackController {
    pub fn new(
        renderer: Arc<dyn SpeechRenderer>,
        player: Arc<dyn AudioPlayer>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            renderer,
            player,
            events,
            line_pause: Duration::from_millis(crate::config::DEFAULT_LINE_PAUSE_MS),
            hard_kill: None,
            active: Arc::new(AtomicBool::new(false)),
            current: Mutex::new(None),
        }
    }

    pub fn from_backend(backend: Backend, events: Arc<dyn EventSink>) -> Self {
        Self::new(backend.renderer, backend.player, events)
    }

    pub fn with_line_pause(mut self, pause: Duration) -> Self {
        self.line_pause = pause;
        self
    }

    /// Let `stop` also terminate the speech processes in `registry`
    ///
    /// This trades the never-truncate guarantee for immediate silence.
    pub fn with_hard_kill(mut self, registry: ProcessRegistry) -> Self {
        self.hard_kill = Some(registry);
        self
    }

    fn current(&self) -> MutexGuard<'_, Option<CurrentSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start a new session reading `document` from `from_index`
    ///
    /// Fails with `ReaderError::SessionConflict` while another session is
    /// active; the request is not queued.
    pub fn start(
        &self,
        document: impl Into<Arc<Document>>,
        from_index: usize,
        params: VoiceParams,
    ) -> Result<SessionHandle> {
        let mut current = self.current();

        if self
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Start rejected: a session is already active");
            return Err(ReaderError::SessionConflict);
        }
        let guard = ActiveGuard(Arc::clone(&self.active));

        if let Some(registry) = &self.hard_kill {
            registry.resume();
        }

        let session = PlaybackSession::new(
            document.into(),
            Arc::clone(&self.renderer),
            Arc::clone(&self.player),
            Arc::clone(&self.events),
        )
        .with_line_pause(self.line_pause)
        .on_settled(move || drop(guard));
        let handle = session.handle();

        let thread = std::thread::Builder::new()
            .name("mdspeak-playback".to_string())
            .spawn(move || session.run(from_index, &params))
            .map_err(|e| {
                error!("Failed to spawn playback thread: {}", e);
                ReaderError::Io(e)
            })?;

        info!("Session started at line {}", from_index);
        *current = Some(CurrentSession {
            handle: handle.clone(),
            thread: Some(thread),
        });
        Ok(handle)
    }

    /// Stop the active session, if any
    ///
    /// Always cooperative: the loop ends at its next checkpoint. With hard
    /// kill enabled the running synthesizer/player is also terminated, and no
    /// new one is started until the next `start`, so the audio stops at once.
    /// Returns whether a live session was told to stop.
    pub fn stop(&self) -> bool {
        let handle = match self.current().as_ref() {
            Some(current) if !current.handle.state().is_terminal() => current.handle.clone(),
            _ => return false,
        };

        handle.request_cancel();
        debug!("Cancel requested");

        if let Some(registry) = &self.hard_kill {
            let killed = registry.halt();
            if killed > 0 {
                info!("Stopped {} speech process(es)", killed);
            }
        }
        true
    }

    /// Terminate the speech processes currently running
    ///
    /// Does not cancel the session by itself; the interrupted line is
    /// reported as a failure and reading continues with the next one.
    pub fn kill_in_flight(&self) -> usize {
        match &self.hard_kill {
            Some(registry) => {
                let killed = registry.kill_all();
                if killed > 0 {
                    info!("Stopped {} speech process(es)", killed);
                }
                killed
            }
            None => 0,
        }
    }

    /// Current activity and reading position; never waits on playback
    pub fn status(&self) -> SessionStatus {
        match self.current().as_ref() {
            Some(current) => current.handle.status(),
            None => SessionStatus::idle(),
        }
    }

    pub fn is_speaking(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Block until the most recent session ends and return its final state
    ///
    /// Returns `None` if no session was started or it was already waited on.
    pub fn wait(&self) -> Option<SessionState> {
        let (handle, thread) = {
            let mut current = self.current();
            let current = current.as_mut()?;
            (current.handle.clone(), current.thread.take()?)
        };

        match thread.join() {
            Ok(state) => Some(state),
            Err(_) => {
                error!("Playback thread panicked");
                handle.mark_failed();
                Some(SessionState::Failed)
            }
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if self.stop() {
            debug!("Controller dropped; stopping playback");
        }
    }
}

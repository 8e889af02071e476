//! Shared fakes for playback tests
//!
//! The fake renderer and player write to a shared journal together with the
//! recording sink, so tests can check the exact interleaving of cursor
//! events, synthesis calls and playback.

#![allow(dead_code)]

use mdspeak::playback::{Activity, EventSink, PlaybackEvent};
use mdspeak::speech::{AudioArtifact, AudioPlayer, SpeechRenderer, VoiceParams};
use mdspeak::{ReaderError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;

pub type Journal = Arc<Mutex<Vec<String>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// How the fake renderer should fail for a given utterance
#[derive(Debug, Clone, Copy)]
pub enum Failure {
    Synthesis,
    Backend,
}

pub struct FakeRenderer {
    dir: TempDir,
    journal: Journal,
    delay: Duration,
    failures: HashMap<String, Failure>,
    spoken: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn new(journal: &Journal) -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            journal: Arc::clone(journal),
            delay: Duration::ZERO,
            failures: HashMap::new(),
            spoken: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing_on(mut self, utterance: &str, failure: Failure) -> Self {
        self.failures.insert(utterance.to_string(), failure);
        self
    }

    /// Every utterance passed to `render`, in call order
    pub fn spoken(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.spoken.lock().unwrap().len()
    }

    /// Number of artifacts still on disk
    pub fn leftover_artifacts(&self) -> usize {
        std::fs::read_dir(self.dir.path()).unwrap().count()
    }
}

impl SpeechRenderer for FakeRenderer {
    fn render(&self, utterance: &str, _params: &VoiceParams) -> Result<AudioArtifact> {
        self.spoken.lock().unwrap().push(utterance.to_string());
        self.journal
            .lock()
            .unwrap()
            .push(format!("render {}", utterance));
        std::thread::sleep(self.delay);

        match self.failures.get(utterance) {
            Some(Failure::Synthesis) => {
                return Err(ReaderError::Synthesis(format!("cannot say '{}'", utterance)))
            }
            Some(Failure::Backend) => {
                return Err(ReaderError::Backend("synthesizer went away".into()))
            }
            None => {}
        }

        let artifact = AudioArtifact::create_in(self.dir.path(), "wav")?;
        std::fs::write(artifact.path(), utterance)?;
        Ok(artifact)
    }
}

pub struct FakePlayer {
    journal: Journal,
    delay: Duration,
    fail: bool,
}

impl FakePlayer {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
            delay: Duration::ZERO,
            fail: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn plays(&self) -> usize {
        self.journal
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.starts_with("play "))
            .count()
    }
}

impl AudioPlayer for FakePlayer {
    fn play(&self, artifact: &AudioArtifact) -> Result<()> {
        let text = std::fs::read_to_string(artifact.path())?;
        std::thread::sleep(self.delay);
        if self.fail {
            return Err(ReaderError::Playback("no audio device".into()));
        }
        self.journal.lock().unwrap().push(format!("play {}", text));
        Ok(())
    }
}

/// Keeps every event and mirrors cursor moves into the journal
pub struct RecordingSink {
    journal: Journal,
    events: Mutex<Vec<PlaybackEvent>>,
}

impl RecordingSink {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: Arc::clone(journal),
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<PlaybackEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn cursor_lines(&self) -> Vec<usize> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::CursorMoved { line } => Some(line),
                _ => None,
            })
            .collect()
    }

    pub fn statuses(&self) -> Vec<Activity> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                PlaybackEvent::StatusChanged { activity } => Some(activity),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<PlaybackEvent> {
        self.events()
            .into_iter()
            .filter(|event| matches!(event, PlaybackEvent::Error { .. }))
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: PlaybackEvent) {
        if let PlaybackEvent::CursorMoved { line } = event {
            self.journal.lock().unwrap().push(format!("cursor {}", line));
        }
        self.events.lock().unwrap().push(event);
    }
}

/// Poll `cond` until it holds or `timeout` passes
pub fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    cond()
}

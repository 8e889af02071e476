//! Speech renderer abstraction
//!
//! A renderer turns one utterance into a complete audio file. It must not
//! return until the file is fully written: the playback loop never plays
//! audio that is still being generated.

use super::AudioArtifact;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Voice and rate for a whole session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceParams {
    /// Voice identifier; empty or "default" selects the system voice
    pub voice: String,

    /// Speaking rate in words per minute
    pub rate_wpm: u32,
}

impl VoiceParams {
    pub fn new(voice: impl Into<String>, rate_wpm: u32) -> Self {
        Self {
            voice: voice.into(),
            rate_wpm,
        }
    }

    /// The explicit voice to request, or `None` for the system default
    pub fn voice_name(&self) -> Option<&str> {
        let voice = self.voice.trim();
        if voice.is_empty() || voice.eq_ignore_ascii_case("default") {
            None
        } else {
            Some(voice)
        }
    }
}

impl Default for VoiceParams {
    fn default() -> Self {
        Self::new("default", 180)
    }
}

/// Speech synthesis into a finished artifact
///
/// Implementations fail with `ReaderError::Synthesis` when the synthesizer
/// cannot be started or exits unsuccessfully. Other error kinds end the
/// playback session.
pub trait SpeechRenderer: Send + Sync {
    /// Render `utterance` (never empty) with the given voice parameters
    fn render(&self, utterance: &str, params: &VoiceParams) -> Result<AudioArtifact>;
}

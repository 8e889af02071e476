//! Error types for mdspeak

use std::io;
use thiserror::Error;

/// Main error type for mdspeak
#[derive(Error, Debug)]
pub enum ReaderError {
    /// The external synthesizer failed for one utterance
    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    /// The external audio player failed for one utterance
    #[error("Audio playback error: {0}")]
    Playback(String),

    /// A session was requested while another one is active
    #[error("A playback session is already active")]
    SessionConflict,

    /// No usable synthesizer or player on this system
    #[error("Speech backend error: {0}")]
    Backend(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("INI parse error: {0}")]
    IniParse(String),

    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("{0}")]
    Other(String),
}

impl ReaderError {
    /// Whether this error only affects the current line.
    ///
    /// Line errors are reported and skipped; anything else ends the session.
    pub fn is_line_error(&self) -> bool {
        matches!(self, ReaderError::Synthesis(_) | ReaderError::Playback(_))
    }
}

/// Result type alias for mdspeak operations
pub type Result<T> = std::result::Result<T, ReaderError>;

impl From<String> for ReaderError {
    fn from(s: String) -> Self {
        ReaderError::Other(s)
    }
}

impl From<&str> for ReaderError {
    fn from(s: &str) -> Self {
        ReaderError::Other(s.to_string())
    }
}

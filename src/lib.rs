//! mdspeak - line-by-line markdown reader
//!
//! Reads a document aloud one display line at a time through an external
//! speech synthesizer, keeping a reading cursor in step with the audio.

pub mod config;
pub mod document;
pub mod error;
pub mod platform;
pub mod playback;
pub mod sanitize;
pub mod speech;

pub use error::{ReaderError, Result};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = "mdspeak";

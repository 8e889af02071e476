//! Audio artifacts produced by the renderer
//!
//! Every synthesis call writes into a freshly named file, so two calls can
//! never collide on the same path. The playback loop owns the artifact and
//! discards it once the player returns.

use crate::Result;
use log::{debug, warn};
use std::path::Path;
use tempfile::TempPath;

/// File name prefix for rendered utterances
pub const ARTIFACT_PREFIX: &str = "mdspeak_tts_";

/// A fully rendered audio file on disk
#[derive(Debug)]
pub struct AudioArtifact {
    path: TempPath,
}

impl AudioArtifact {
    /// Reserve a uniquely named, empty file in `dir`
    ///
    /// `extension` is given without the dot (e.g. "wav").
    pub fn create_in(dir: &Path, extension: &str) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(&format!(".{}", extension))
            .tempfile_in(dir)?;

        let path = file.into_temp_path();
        debug!("Reserved audio artifact {:?}", &*path);
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the rendered audio in bytes (0 if missing)
    pub fn len(&self) -> u64 {
        std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete the file; failures are logged, never returned
    pub fn discard(self) {
        let shown = self.path.to_path_buf();
        if let Err(e) = self.path.close() {
            warn!("Failed to delete audio artifact {:?}: {}", shown, e);
        }
    }
}

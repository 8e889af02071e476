//! Audio player abstraction

use super::AudioArtifact;
use crate::Result;

/// Plays a rendered artifact to completion
///
/// `play` returns only after the last sample has been played, not when the
/// player process has merely been spawned. Failures are reported as
/// `ReaderError::Playback`. The caller deletes the artifact afterwards.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, artifact: &AudioArtifact) -> Result<()>;
}

//! espeak-ng renderer
//!
//! Writes each utterance to a WAV file with `espeak-ng -w`, which returns
//! only after the file is complete.
//!
//! Dependencies:
//! - espeak-ng (install with: sudo apt install espeak-ng)

use super::{finish_render, spoken_arg};
use crate::speech::{AudioArtifact, ProcessRegistry, SpeechRenderer, VoiceParams};
use crate::Result;
use log::debug;
use std::path::PathBuf;
use std::process::Command;

/// Slowest and fastest speeds espeak-ng accepts (words per minute)
const MIN_SPEED: u32 = 80;
const MAX_SPEED: u32 = 450;

pub struct EspeakRenderer {
    espeak: PathBuf,
    artifact_dir: PathBuf,
    registry: ProcessRegistry,
}

impl EspeakRenderer {
    pub fn new(espeak: PathBuf, artifact_dir: PathBuf, registry: ProcessRegistry) -> Self {
        Self {
            espeak,
            artifact_dir,
            registry,
        }
    }

    fn speed(rate_wpm: u32) -> u32 {
        rate_wpm.clamp(MIN_SPEED, MAX_SPEED)
    }

    fn command(&self, text: &str, params: &VoiceParams, artifact: &AudioArtifact) -> Command {
        let mut cmd = Command::new(&self.espeak);
        if let Some(voice) = params.voice_name() {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("-s").arg(Self::speed(params.rate_wpm).to_string());
        cmd.arg("-w").arg(artifact.path());
        cmd.arg(spoken_arg(text));
        cmd
    }
}

impl SpeechRenderer for EspeakRenderer {
    fn render(&self, utterance: &str, params: &VoiceParams) -> Result<AudioArtifact> {
        let artifact = AudioArtifact::create_in(&self.artifact_dir, "wav")?;
        debug!("Rendering with espeak-ng into {:?}", artifact.path());

        let cmd = self.command(utterance, params, &artifact);
        finish_render("espeak-ng", self.registry.run(cmd), artifact)
    }
}

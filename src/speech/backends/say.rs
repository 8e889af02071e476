//! macOS backend: `say` renders AIFF files, `afplay` plays them
//!
//! `say -o` only returns once the whole file is written, and `afplay` only
//! exits after the last sample has been played.

use super::{finish_playback, finish_render, spoken_arg};
use crate::speech::{AudioArtifact, AudioPlayer, ProcessRegistry, SpeechRenderer, VoiceParams};
use crate::{ReaderError, Result};
use log::debug;
use std::path::PathBuf;
use std::process::Command;

/// Renderer using the macOS `say` command
pub struct SayRenderer {
    say: PathBuf,
    artifact_dir: PathBuf,
    registry: ProcessRegistry,
}

impl SayRenderer {
    pub fn new(say: PathBuf, artifact_dir: PathBuf, registry: ProcessRegistry) -> Self {
        Self {
            say,
            artifact_dir,
            registry,
        }
    }

    fn command(&self, text: &str, params: &VoiceParams, artifact: &AudioArtifact) -> Command {
        let mut cmd = Command::new(&self.say);
        if let Some(voice) = params.voice_name() {
            cmd.arg("-v").arg(voice);
        }
        cmd.arg("-r").arg(params.rate_wpm.to_string());
        cmd.arg("-o").arg(artifact.path());
        cmd.arg("--file-format=AIFF");
        cmd.arg(spoken_arg(text));
        cmd
    }
}

impl SpeechRenderer for SayRenderer {
    fn render(&self, utterance: &str, params: &VoiceParams) -> Result<AudioArtifact> {
        let artifact = AudioArtifact::create_in(&self.artifact_dir, "aiff")?;
        debug!("Rendering with say into {:?}", artifact.path());

        let cmd = self.command(utterance, params, &artifact);
        finish_render("say", self.registry.run(cmd), artifact)
    }
}

/// Player using the macOS `afplay` command
pub struct AfplayPlayer {
    afplay: PathBuf,
    registry: ProcessRegistry,
}

impl AfplayPlayer {
    pub fn new(afplay: PathBuf, registry: ProcessRegistry) -> Self {
        Self { afplay, registry }
    }
}

impl AudioPlayer for AfplayPlayer {
    fn play(&self, artifact: &AudioArtifact) -> Result<()> {
        if artifact.is_empty() {
            return Err(ReaderError::Playback("artifact is empty".to_string()));
        }

        let mut cmd = Command::new(&self.afplay);
        cmd.arg(artifact.path());
        finish_playback("afplay", self.registry.run(cmd))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_default_voice() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SayRenderer::new("say".into(), dir.path().into(), ProcessRegistry::new());
        let artifact = AudioArtifact::create_in(dir.path(), "aiff").unwrap();

        let cmd = renderer.command("Hello", &VoiceParams::new("default", 200), &artifact);
        let args = args(&cmd);
        assert!(!args.contains(&"-v".to_string()));
        assert_eq!(args[0..2], ["-r", "200"]);
        assert_eq!(args.last().map(String::as_str), Some("Hello"));
    }

    #[test]
    fn test_command_named_voice() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = SayRenderer::new("say".into(), dir.path().into(), ProcessRegistry::new());
        let artifact = AudioArtifact::create_in(dir.path(), "aiff").unwrap();

        let cmd = renderer.command("- dash", &VoiceParams::new("Samantha", 180), &artifact);
        let args = args(&cmd);
        assert_eq!(args[0..2], ["-v", "Samantha"]);
        assert!(args.contains(&"--file-format=AIFF".to_string()));
        assert_eq!(args.last().map(String::as_str), Some(" - dash"));
    }
}

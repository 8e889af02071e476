//! Platform-specific speech backends
//!
//! Each backend pairs a renderer (text to audio file) with a player (audio
//! file to speakers). Both run as short-lived external processes tracked by
//! a shared `ProcessRegistry`.

// macOS say + afplay
pub mod say;

// espeak-ng renderer for Linux/WSL
pub mod espeak;

// paplay/aplay player for Linux/WSL
pub mod pulseaudio;

use super::process::Finished;
use super::{AudioArtifact, AudioPlayer, ProcessRegistry, SpeechRenderer};
use crate::config::Config;
use crate::platform::{find_program, is_macos, is_wsl};
use crate::{ReaderError, Result};
use log::info;
use pulseaudio::{PlayerKind, PulseAudioPlayer};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

/// A matched renderer and player
#[derive(Clone)]
pub struct Backend {
    pub renderer: Arc<dyn SpeechRenderer>,
    pub player: Arc<dyn AudioPlayer>,
}

/// Create the renderer/player pair for this platform
///
/// `synthesizer` and `player` in the config may force a choice; "auto"
/// picks the first available program:
///
/// **macOS:** `say` + `afplay`
///
/// **Linux / WSL:** `espeak-ng` + `paplay`, falling back to `aplay`
pub fn create_backend(config: &Config, registry: &ProcessRegistry) -> Result<Backend> {
    let artifact_dir = config.artifact_dir();
    let renderer = create_renderer(&config.synthesizer(), artifact_dir, registry)?;
    let player = create_player(&config.player(), registry)?;
    Ok(Backend { renderer, player })
}

fn create_renderer(
    choice: &str,
    artifact_dir: PathBuf,
    registry: &ProcessRegistry,
) -> Result<Arc<dyn SpeechRenderer>> {
    let candidates: &[&str] = match choice {
        "auto" if is_macos() => &["say", "espeak-ng"],
        "auto" => &["espeak-ng", "say"],
        "say" => &["say"],
        "espeak-ng" => &["espeak-ng"],
        other => {
            return Err(ReaderError::Config(format!(
                "Unknown synthesizer '{}' (expected auto, say or espeak-ng)",
                other
            )))
        }
    };

    let found = candidates.iter().find_map(|name| match find_program(name) {
        Some(path) => Some((*name, path)),
        None => {
            info!("✗ Synthesizer {} not found", name);
            None
        }
    });

    let Some((name, path)) = found else {
        return Err(ReaderError::Backend(format!(
            "No speech synthesizer available. Tried: {}\n\
             Install espeak-ng (sudo apt install espeak-ng) or run on macOS",
            candidates.join(", ")
        )));
    };

    info!("✓ Using synthesizer {} at {:?}", name, path);
    let registry = registry.clone();
    let renderer: Arc<dyn SpeechRenderer> = match name {
        "say" => Arc::new(say::SayRenderer::new(path, artifact_dir, registry)),
        _ => Arc::new(espeak::EspeakRenderer::new(path, artifact_dir, registry)),
    };
    Ok(renderer)
}

fn create_player(choice: &str, registry: &ProcessRegistry) -> Result<Arc<dyn AudioPlayer>> {
    let candidates: &[&str] = match choice {
        "auto" if is_macos() => &["afplay"],
        "auto" if is_wsl() => &["paplay", "aplay"],
        "auto" => &["paplay", "aplay", "afplay"],
        "afplay" => &["afplay"],
        "paplay" => &["paplay"],
        "aplay" => &["aplay"],
        other => {
            return Err(ReaderError::Config(format!(
                "Unknown player '{}' (expected auto, afplay, paplay or aplay)",
                other
            )))
        }
    };

    let mut last_error = None;
    for name in candidates {
        let Some(path) = find_program(name) else {
            info!("✗ Player {} not found", name);
            continue;
        };
        let player: Result<Arc<dyn AudioPlayer>> = match *name {
            "afplay" => Ok(Arc::new(say::AfplayPlayer::new(path, registry.clone()))
                as Arc<dyn AudioPlayer>),
            "paplay" => PulseAudioPlayer::new(PlayerKind::Paplay, path, registry.clone())
                .map(|p| Arc::new(p) as Arc<dyn AudioPlayer>),
            _ => PulseAudioPlayer::new(PlayerKind::Aplay, path, registry.clone())
                .map(|p| Arc::new(p) as Arc<dyn AudioPlayer>),
        };
        match player {
            Ok(player) => {
                info!("✓ Using player {}", name);
                return Ok(player);
            }
            Err(e) => {
                info!("✗ Player {} unavailable: {}", name, e);
                last_error = Some(e);
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        ReaderError::Backend(format!(
            "No audio player available. Tried: {}\n\
             Install pulseaudio-utils or alsa-utils",
            candidates.join(", ")
        ))
    }))
}

/// Text argument for a synthesizer command line
///
/// A leading dash would otherwise be parsed as an option.
fn spoken_arg(text: &str) -> String {
    if text.starts_with('-') {
        format!(" {}", text)
    } else {
        text.to_string()
    }
}

/// Turn a finished synthesizer run into a materialized artifact
fn finish_render(
    program: &str,
    run: io::Result<Finished>,
    artifact: AudioArtifact,
) -> Result<AudioArtifact> {
    let outcome = match run {
        Err(e) => Err(format!("failed to start {}: {}", program, e)),
        Ok(f) if f.killed => Err(format!("{} was stopped", program)),
        Ok(f) if !f.status.success() => {
            Err(format!("{} failed ({}): {}", program, f.status, f.stderr))
        }
        Ok(_) if artifact.is_empty() => Err(format!("{} produced no audio", program)),
        Ok(_) => Ok(()),
    };

    match outcome {
        Ok(()) => Ok(artifact),
        Err(message) => {
            artifact.discard();
            Err(ReaderError::Synthesis(message))
        }
    }
}

/// Map a finished player run to the playback result
fn finish_playback(program: &str, run: io::Result<Finished>) -> Result<()> {
    match run {
        Err(e) => Err(ReaderError::Playback(format!("failed to start {}: {}", program, e))),
        Ok(f) if f.killed => Err(ReaderError::Playback(format!("{} was stopped", program))),
        Ok(f) if !f.status.success() => Err(ReaderError::Playback(format!(
            "{} failed ({}): {}",
            program, f.status, f.stderr
        ))),
        Ok(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;

    #[test]
    fn test_spoken_arg() {
        assert_eq!(spoken_arg("hello"), "hello");
        assert_eq!(spoken_arg("-v"), " -v");
    }

    #[test]
    fn test_finish_render_rejects_empty_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = AudioArtifact::create_in(dir.path(), "wav").unwrap();
        let path = artifact.path().to_path_buf();

        let run = ProcessRegistry::new().run(Command::new("true"));
        let result = finish_render("true", run, artifact);
        assert!(matches!(result, Err(ReaderError::Synthesis(_))));
        assert!(!path.exists());
    }

    #[test]
    fn test_finish_render_failure_status() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = AudioArtifact::create_in(dir.path(), "wav").unwrap();

        let run = ProcessRegistry::new().run(Command::new("false"));
        match finish_render("false", run, artifact) {
            Err(ReaderError::Synthesis(msg)) => assert!(msg.contains("false failed")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_finish_render_success() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = AudioArtifact::create_in(dir.path(), "wav").unwrap();
        std::fs::write(artifact.path(), b"RIFF").unwrap();

        let run = ProcessRegistry::new().run(Command::new("true"));
        let artifact = finish_render("true", run, artifact).unwrap();
        assert_eq!(artifact.len(), 4);
    }

    #[test]
    fn test_finish_playback_spawn_error() {
        let run = ProcessRegistry::new().run(Command::new("/nonexistent/player"));
        assert!(matches!(
            finish_playback("player", run),
            Err(ReaderError::Playback(_))
        ));
    }

    #[test]
    fn test_unknown_choices() {
        let registry = ProcessRegistry::new();
        assert!(matches!(
            create_renderer("festival", std::env::temp_dir(), &registry),
            Err(ReaderError::Config(_))
        ));
        assert!(matches!(
            create_player("mplayer", &registry),
            Err(ReaderError::Config(_))
        ));
    }
}

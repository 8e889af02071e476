//! PulseAudio / ALSA player
//!
//! Plays rendered WAV files with `paplay` (or `aplay` when PulseAudio isn't
//! around). Both commands exit only after playback has drained.
//!
//! On WSL with WSLG, PulseAudio is reachable through /mnt/wslg/PulseServer;
//! `PULSE_SERVER` is pointed there automatically when it isn't already set.

use super::finish_playback;
use crate::platform::is_wsl;
use crate::speech::{AudioArtifact, AudioPlayer, ProcessRegistry};
use crate::{ReaderError, Result};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::process::Command;

const WSLG_PULSE_PATH: &str = "/mnt/wslg/PulseServer";

/// Which command-line player is in use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerKind {
    Paplay,
    Aplay,
}

impl PlayerKind {
    pub fn program(self) -> &'static str {
        match self {
            PlayerKind::Paplay => "paplay",
            PlayerKind::Aplay => "aplay",
        }
    }
}

pub struct PulseAudioPlayer {
    kind: PlayerKind,
    binary: PathBuf,

    /// PulseAudio server to hand to the player, if any
    pulse_server: Option<String>,

    registry: ProcessRegistry,
}

impl PulseAudioPlayer {
    pub fn new(kind: PlayerKind, binary: PathBuf, registry: ProcessRegistry) -> Result<Self> {
        let pulse_server = if kind == PlayerKind::Paplay {
            Self::pulse_server()?
        } else {
            None
        };

        debug!("Using {} at {:?}", kind.program(), binary);
        Ok(Self {
            kind,
            binary,
            pulse_server,
            registry,
        })
    }

    /// Work out which PulseAudio server the player should talk to
    ///
    /// `None` means the player's own default (environment or default socket).
    fn pulse_server() -> Result<Option<String>> {
        if std::env::var("PULSE_SERVER").is_ok() {
            debug!("PULSE_SERVER already set via environment");
            return Ok(None);
        }

        if Path::new(WSLG_PULSE_PATH).exists() {
            info!("Auto-detected WSLG PulseAudio server at {}", WSLG_PULSE_PATH);
            return Ok(Some(WSLG_PULSE_PATH.to_string()));
        }

        if is_wsl() {
            warn!("WSLG PulseAudio server not found at {}", WSLG_PULSE_PATH);
            warn!("Make sure WSLg is installed and running, or set PULSE_SERVER");
            return Err(ReaderError::Backend(
                "PulseAudio server not found. Install WSLg or set PULSE_SERVER environment variable."
                    .to_string(),
            ));
        }

        debug!("Running on native Linux - PulseAudio will use default configuration");
        Ok(None)
    }

    fn command(&self, artifact: &AudioArtifact) -> Command {
        let mut cmd = Command::new(&self.binary);
        if let Some(server) = &self.pulse_server {
            cmd.env("PULSE_SERVER", server);
        }
        if self.kind == PlayerKind::Aplay {
            cmd.arg("-q");
        }
        cmd.arg(artifact.path());
        cmd
    }
}

impl AudioPlayer for PulseAudioPlayer {
    fn play(&self, artifact: &AudioArtifact) -> Result<()> {
        if artifact.is_empty() {
            return Err(ReaderError::Playback("artifact is empty".to_string()));
        }

        let cmd = self.command(artifact);
        finish_playback(self.kind.program(), self.registry.run(cmd))
    }
}

//! Configuration management
//!
//! Settings live in an INI file (`~/.mdspeak.cfg`) that is created with
//! defaults on first run. Command-line flags override these per run.

use crate::speech::VoiceParams;
use crate::{ReaderError, Result};
use ini::Ini;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default speaking rate in words per minute
pub const DEFAULT_RATE: u32 = 180;

/// Accepted speaking rates (words per minute)
pub const MIN_RATE: u32 = 50;
pub const MAX_RATE: u32 = 500;

/// Default pause between spoken lines
pub const DEFAULT_LINE_PAUSE_MS: u64 = 100;
const MAX_LINE_PAUSE_MS: u64 = 2000;

/// Reader configuration backed by an INI file
pub struct Config {
    ini: Ini,

    /// Config file path
    path: PathBuf,
}

impl Config {
    /// Load configuration from `~/.mdspeak.cfg`, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path())
    }

    /// Load configuration from an explicit path, creating it if missing
    pub fn load_from(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        debug!("Loading config from {:?}", path);

        let ini = if path.exists() {
            Ini::load_from_file(&path)
                .map_err(|e| ReaderError::IniParse(format!("Failed to load config: {}", e)))?
        } else {
            info!("Config file not found, creating default");
            let default = Self::default_config();
            default
                .write_to_file(&path)
                .map_err(|e| ReaderError::IniParse(format!("Failed to write config: {}", e)))?;
            default
        };

        Ok(Self { ini, path })
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        debug!("Saving config to {:?}", self.path);
        self.ini
            .write_to_file(&self.path)
            .map_err(|e| ReaderError::Config(format!("Failed to save config: {}", e)))
    }

    /// Default config file path (~/.mdspeak.cfg)
    fn config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".mdspeak.cfg")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn default_config() -> Ini {
        let mut ini = Ini::new();

        ini.with_section(Some("speech"))
            .set("voice", "default")
            .set("rate", DEFAULT_RATE.to_string())
            .set("line_pause_ms", DEFAULT_LINE_PAUSE_MS.to_string())
            .set("synthesizer", "auto")
            .set("player", "auto")
            .set("hard_kill_on_stop", "true");

        ini
    }

    /// Get a boolean value from config
    pub fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Get a string value from config
    pub fn get_string(&self, section: &str, key: &str, default: &str) -> String {
        self.ini
            .get_from(Some(section), key)
            .map(str::trim)
            .unwrap_or(default)
            .to_string()
    }

    /// Get an integer value from config
    pub fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini
            .get_from(Some(section), key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Set a value in config
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.ini.with_section(Some(section)).set(key, value);
    }

    /// Voice identifier; "default" means the system voice
    pub fn voice(&self) -> String {
        self.get_string("speech", "voice", "default")
    }

    /// Speaking rate, falling back to the default when out of range
    pub fn rate(&self) -> u32 {
        u32::try_from(self.get_int("speech", "rate", i64::from(DEFAULT_RATE)))
            .ok()
            .filter(|r| (MIN_RATE..=MAX_RATE).contains(r))
            .unwrap_or(DEFAULT_RATE)
    }

    /// Voice parameters for a new session
    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams::new(self.voice(), self.rate())
    }

    /// Pause inserted after each spoken line
    pub fn line_pause(&self) -> Duration {
        let ms = u64::try_from(self.get_int("speech", "line_pause_ms", DEFAULT_LINE_PAUSE_MS as i64))
            .unwrap_or(DEFAULT_LINE_PAUSE_MS)
            .min(MAX_LINE_PAUSE_MS);
        Duration::from_millis(ms)
    }

    /// Synthesizer choice: auto, say or espeak-ng
    pub fn synthesizer(&self) -> String {
        self.get_string("speech", "synthesizer", "auto")
    }

    /// Player choice: auto, afplay, paplay or aplay
    pub fn player(&self) -> String {
        self.get_string("speech", "player", "auto")
    }

    /// Should Stop also kill the running speech processes?
    /// When true, audio goes silent at once instead of finishing the line
    pub fn hard_kill_on_stop(&self) -> bool {
        self.get_bool("speech", "hard_kill_on_stop", true)
    }

    /// Directory for rendered audio files
    pub fn artifact_dir(&self) -> PathBuf {
        let dir = self.get_string("speech", "artifact_dir", "");
        if dir.is_empty() {
            std::env::temp_dir()
        } else {
            PathBuf::from(dir)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdspeak.cfg");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.voice(), "default");
        assert_eq!(config.rate(), DEFAULT_RATE);
        assert_eq!(config.line_pause(), Duration::from_millis(100));
        assert_eq!(config.synthesizer(), "auto");
        assert_eq!(config.player(), "auto");
        assert!(config.hard_kill_on_stop());
        assert_eq!(config.artifact_dir(), std::env::temp_dir());
    }

    #[test]
    fn test_out_of_range_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mdspeak.cfg");
        std::fs::write(&path, "[speech]\nrate = 9000\nline_pause_ms = 99999\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.rate(), DEFAULT_RATE);
        assert_eq!(config.line_pause(), Duration::from_millis(2000));
    }
}

//! Voice enumeration
//!
//! Lists the voice identifiers the installed synthesizer accepts, for
//! presenting a choice to the user. The playback loop never calls this.

use crate::platform::find_program;
use crate::{ReaderError, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::process::Command;

/// `Name With Spaces    en_US    # sample sentence`
static SAY_VOICE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(.+?)\s+[a-z]{2,3}[_-][A-Za-z0-9_]+\s+#").expect("voice pattern must compile")
});

/// Parse the output of `say -v ?`
pub fn parse_say_voices(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| match SAY_VOICE_LINE.captures(line) {
            Some(caps) => caps.get(1).map(|m| m.as_str().trim().to_string()),
            None => line.split_whitespace().next().map(str::to_string),
        })
        .collect()
}

/// Parse the output of `espeak-ng --voices`
///
/// Returns the language column, which `espeak-ng -v` accepts directly.
pub fn parse_espeak_voices(output: &str) -> Vec<String> {
    output
        .lines()
        .skip_while(|line| !line.trim_start().starts_with("Pty"))
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(str::to_string)
        .collect()
}

/// Voices offered by the first synthesizer found on this system
pub fn list_voices() -> Result<Vec<String>> {
    if let Some(say) = find_program("say") {
        let output = Command::new(say).args(["-v", "?"]).output()?;
        if output.status.success() {
            let voices = parse_say_voices(&String::from_utf8(output.stdout)?);
            debug!("say reports {} voices", voices.len());
            return Ok(voices);
        }
    }

    if let Some(espeak) = find_program("espeak-ng") {
        let output = Command::new(espeak).arg("--voices").output()?;
        if output.status.success() {
            let voices = parse_espeak_voices(&String::from_utf8(output.stdout)?);
            debug!("espeak-ng reports {} voices", voices.len());
            return Ok(voices);
        }
    }

    Err(ReaderError::Backend(
        "No synthesizer available to list voices".to_string(),
    ))
}

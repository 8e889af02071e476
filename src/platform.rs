//! Platform detection utilities

use std::fs;
use std::path::PathBuf;

/// Detect if running in WSL (Windows Subsystem for Linux)
///
/// Checks for WSL-specific indicators in /proc/version and environment variables.
pub fn is_wsl() -> bool {
    if let Ok(contents) = fs::read_to_string("/proc/version") {
        let lower = contents.to_lowercase();
        if lower.contains("microsoft") || lower.contains("wsl") {
            return true;
        }
    }

    std::env::var("WSL_DISTRO_NAME").is_ok()
}

pub fn is_macos() -> bool {
    std::env::consts::OS == "macos"
}

/// Locate an executable on `$PATH`
///
/// Names containing a path separator are checked as-is.
pub fn find_program(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

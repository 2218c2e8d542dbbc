//! ffmpeg discovery.
//!
//! Capture is delegated to an ffmpeg child process. Well-known install
//! locations are searched before `PATH`.

use anyhow::{anyhow, Result};
use std::path::PathBuf;

/// Environment variable that overrides ffmpeg discovery.
pub const FFMPEG_ENV: &str = "VOXSCRIBE_FFMPEG";

fn binary_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "ffmpeg.exe"
    } else {
        "ffmpeg"
    }
}

fn well_known_locations() -> Vec<PathBuf> {
    let dirs: &[&str] = if cfg!(target_os = "macos") {
        &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"]
    } else if cfg!(target_os = "linux") {
        &["/usr/bin", "/usr/local/bin", "/snap/bin"]
    } else if cfg!(target_os = "windows") {
        &["C:\\ffmpeg\\bin", "C:\\Program Files\\ffmpeg\\bin"]
    } else {
        &[]
    };
    dirs.iter().map(|d| PathBuf::from(d).join(binary_name())).collect()
}

/// Locates the ffmpeg binary.
///
/// Order: `$VOXSCRIBE_FFMPEG`, well-known install directories, then `PATH`.
pub fn find_ffmpeg() -> Result<PathBuf> {
    if let Some(path) = std::env::var_os(FFMPEG_ENV).map(PathBuf::from) {
        if path.is_file() {
            return Ok(path);
        }
        tracing::warn!("{} points to a missing file: {}", FFMPEG_ENV, path.display());
    }

    let from_path = std::env::var_os("PATH")
        .map(|paths| {
            std::env::split_paths(&paths)
                .map(|dir| dir.join(binary_name()))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    well_known_locations()
        .into_iter()
        .chain(from_path)
        .find(|candidate| candidate.is_file())
        .inspect(|path| tracing::debug!("Found ffmpeg at: {}", path.display()))
        .ok_or_else(|| {
            anyhow!(
                "ffmpeg not found. Please install ffmpeg:\n\
                 macOS: brew install ffmpeg\n\
                 Linux: apt install ffmpeg (Debian/Ubuntu) or dnf install ffmpeg (Fedora)\n\
                 Windows: Download from https://ffmpeg.org/download.html"
            )
        })
}

//! Play back or export a saved recording.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::Workspace;

/// Plays a saved recording with the system's audio player.
///
/// On macOS the file is handed to `open`; elsewhere `xdg-open` is tried first,
/// then common players (mpv, vlc, ffplay, paplay).
///
/// # Arguments
/// * `index` - 1 = most recent (the default)
pub fn handle_replay(index: Option<usize>) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxscribe Replay Command ===");

    let workspace = Workspace::load()?;
    let record = workspace.record_at(index)?;

    let playback_path = std::env::temp_dir().join(format!(
        "voxscribe-{}.{}",
        record.id,
        record.audio_extension()
    ));
    std::fs::write(&playback_path, &record.audio)?;

    tracing::info!(
        "Playing {} from {}",
        record.id,
        record.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    let played = play(&playback_path);

    if let Err(e) = std::fs::remove_file(&playback_path) {
        tracing::debug!("Failed to remove playback file: {e}");
    }
    played
}

/// Writes a saved recording's audio to `path`.
pub fn handle_export(index: Option<usize>, path: PathBuf) -> Result<(), anyhow::Error> {
    let workspace = Workspace::load()?;
    let record = workspace.record_at(index)?;

    std::fs::write(&path, &record.audio)
        .map_err(|e| anyhow::anyhow!("Failed to write '{}': {e}", path.display()))?;
    tracing::info!("Exported {} to {}", record.id, path.display());
    println!(
        "Exported {} ({}, {} bytes) to {}",
        record.id,
        record.mime_type,
        record.audio.len(),
        path.display()
    );
    Ok(())
}

fn play(path: &Path) -> anyhow::Result<()> {
    let players: &[&str] = if cfg!(target_os = "macos") {
        &["open", "afplay"]
    } else {
        &["xdg-open", "mpv", "vlc", "ffplay", "paplay"]
    };

    for player in players {
        let Ok(mut child) = Command::new(player).arg(path).spawn() else {
            tracing::debug!("{player} not available");
            continue;
        };
        child
            .wait()
            .map_err(|e| anyhow::anyhow!("Audio player error: {e}"))?;
        tracing::info!("Playback finished via {player}");
        return Ok(());
    }

    Err(anyhow::anyhow!(
        "No audio player found. Install mpv, vlc, ffplay, or paplay"
    ))
}

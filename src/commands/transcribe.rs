//! Transcribe a pre-recorded audio file without recording.
//!
//! Runs the file through the same orchestrator as `record`, including the
//! fallback chain and the saved history.

use std::path::PathBuf;

use super::{transcribe_and_save, OutputTarget, Pending, Workspace};
use crate::recording::load_audio_file;

/// Transcribes `file` and saves it to the signed-in user's history.
///
/// # Errors
/// - If the file does not exist or cannot be read
/// - If transcription fails
pub async fn handle_transcribe(file: PathBuf, output: OutputTarget) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxscribe Transcribe Command ===");

    if !file.exists() {
        return Err(anyhow::anyhow!("Audio file not found: {}", file.display()));
    }

    let workspace = Workspace::load()?;
    let audio = load_audio_file(&file)?;
    tracing::info!(
        "Transcribing file: {} ({}, {} bytes)",
        file.display(),
        audio.mime_type,
        audio.bytes.len()
    );

    let delivered = transcribe_and_save(&workspace, Pending::Imported(audio), &output).await?;
    tracing::info!(
        "Delivered {} characters (saved: {})",
        delivered.transcript.chars().count(),
        delivered.saved.is_ok()
    );
    Ok(())
}

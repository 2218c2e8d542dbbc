//! Listing and removing saved voice notes.

use cliclack::{confirm, intro, outro};
use console::style;

use super::Workspace;
use crate::history::{RecordStore, VoiceRecord};

/// Number of characters of the transcript shown per row.
const PREVIEW_CHARS: usize = 60;

/// Prints the signed-in user's recordings, most recent first.
///
/// # Errors
/// - If nobody is signed in
/// - If the history database cannot be read
pub fn handle_history() -> Result<(), anyhow::Error> {
    tracing::info!("=== voxscribe History ===");

    let workspace = Workspace::load()?;
    let mut store = workspace.history()?;
    let records = store.list_recent(store.cap())?;

    if records.is_empty() {
        println!("No recordings saved yet.");
        return Ok(());
    }

    for (index, record) in records.iter().enumerate() {
        println!("{}", format_row(index + 1, record));
    }
    Ok(())
}

/// Deletes one recording by id.
pub fn handle_delete(id: &str) -> Result<(), anyhow::Error> {
    let workspace = Workspace::load()?;
    let mut store = workspace.history()?;

    if store.delete_by_id(id)? {
        tracing::info!("Deleted recording {id}");
        println!("{} Deleted {id}", style("✓").green());
        Ok(())
    } else {
        Err(anyhow::anyhow!("No recording with id '{id}'"))
    }
}

/// Deletes every recording after confirmation (skipped with `yes`).
pub fn handle_clear(yes: bool) -> Result<(), anyhow::Error> {
    let workspace = Workspace::load()?;
    let mut store = workspace.history()?;

    if !yes {
        intro(style(" clear history ").on_white().black())?;
        let proceed = confirm("Delete all saved recordings?")
            .initial_value(false)
            .interact()?;
        if !proceed {
            outro("Nothing deleted.")?;
            return Ok(());
        }
    }

    let removed = store.clear_all()?;
    tracing::info!("Cleared {removed} recordings");
    println!("{} Deleted {removed} recordings", style("✓").green());
    Ok(())
}

fn format_row(position: usize, record: &VoiceRecord) -> String {
    format!(
        "{:>2}. {}  {}  {:>5.1}s  {}",
        position,
        style(&record.id).dim(),
        record.created_at.format("%Y-%m-%d %H:%M"),
        record.duration_secs,
        summary(&record.transcript)
    )
}

/// Preview, or a marker for recordings whose transcription failed.
fn summary(transcript: &str) -> String {
    if transcript.trim().is_empty() {
        style("(not transcribed)").dim().to_string()
    } else {
        preview(transcript)
    }
}

/// First line of the transcript, shortened to [`PREVIEW_CHARS`].
fn preview(transcript: &str) -> String {
    let first_line = transcript.lines().next().unwrap_or_default();
    if first_line.chars().count() > PREVIEW_CHARS {
        let cut: String = first_line.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}…")
    } else {
        first_line.to_string()
    }
}

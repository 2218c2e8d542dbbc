//! Transcribe a saved recording again without re-recording it.
//!
//! Recordings whose transcription failed are kept with an empty transcript;
//! this is how they get one.

use console::style;

use super::{transcribe_and_save, OutputTarget, Pending, Workspace};

/// Re-runs transcription for a saved recording and updates it in place.
///
/// # Arguments
/// * `index` - 1 = most recent (the default)
///
/// # Errors
/// - If nobody is signed in or no API key is configured
/// - If the index is out of range
/// - If transcription fails
pub async fn handle_retry(index: Option<usize>, output: OutputTarget) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxscribe Retry Command ===");

    let workspace = Workspace::load()?;
    workspace.ensure_ready()?;
    let record = workspace.record_at(index)?;

    tracing::info!(
        "Retrying transcription for recording #{} ({})",
        index.unwrap_or(1),
        record.id
    );
    eprintln!(
        "{} Retrying {} ({:.1}s)",
        style("↻").cyan(),
        record.id,
        record.duration_secs
    );

    let delivered = transcribe_and_save(&workspace, Pending::Stored(record), &output).await?;
    if let Ok(id) = &delivered.saved {
        tracing::info!("Updated transcript of {id}");
    }
    Ok(())
}

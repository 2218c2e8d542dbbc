//! Microphone recording followed by transcription.
//!
//! Capture runs until the user presses Enter; Ctrl-C while recording discards
//! the capture without calling the endpoint. Session and API key are checked
//! before the microphone is opened.

use console::style;
use std::io::BufRead;

use super::{transcribe_and_save, OutputTarget, Pending, Workspace};
use crate::recording::{FfmpegRecorder, Recorder, RecordingError};
use crate::transcription::OrchestrationError;

/// Records one voice note, then transcribes and saves it.
///
/// # Errors
/// - `NotAuthenticated` or `MissingCredential` before anything is recorded
/// - `DeviceDenied` if the microphone cannot be opened
/// - If capture fails or transcription fails
pub async fn handle_record(output: OutputTarget) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxscribe Recorder Started ===");

    let workspace = Workspace::load()?;
    workspace.ensure_ready()?;
    tracing::info!(
        "Recording from {} {}",
        workspace.config.recording.input_format,
        workspace.config.recording.input_device
    );

    let recorder = FfmpegRecorder::new(&workspace.config.recording, &workspace.data_dir);
    let starter = recorder.clone();
    let handle = off_runtime(move || starter.start_capture()).await?;

    eprintln!(
        "{} Recording… press {} to transcribe, {} to cancel",
        style("●").red(),
        style("Enter").bold(),
        style("Ctrl-C").bold()
    );

    let stopped = tokio::select! {
        line = wait_for_enter() => line,
        _ = tokio::signal::ctrl_c() => false,
    };

    let audio = off_runtime(move || recorder.stop_capture(handle)).await?;
    if !stopped {
        tracing::info!("Recording cancelled ({:.1}s discarded)", audio.duration_secs);
        eprintln!("{} Recording discarded", style("✗").red());
        return Ok(());
    }

    eprintln!(
        "{} Recorded {:.1}s",
        style("■").cyan(),
        audio.duration_secs
    );
    let delivered = transcribe_and_save(&workspace, Pending::Captured(audio), &output).await?;
    tracing::info!(
        "Delivered {} characters (saved: {})",
        delivered.transcript.chars().count(),
        delivered.saved.is_ok()
    );

    tracing::info!("=== voxscribe Recorder Exited Successfully ===");
    Ok(())
}

/// Resolves when a line (or EOF) arrives on stdin.
///
/// The read runs on a detached thread so a cancelled recording does not keep
/// the process alive waiting for input.
async fn wait_for_enter() -> bool {
    let (tx, rx) = tokio::sync::oneshot::channel();
    std::thread::spawn(move || {
        let mut line = String::new();
        let _ = tx.send(std::io::stdin().lock().read_line(&mut line).is_ok());
    });
    rx.await.unwrap_or(false)
}

/// Runs recorder work that waits on ffmpeg on the blocking pool.
async fn off_runtime<T, F>(work: F) -> anyhow::Result<T>
where
    F: FnOnce() -> Result<T, RecordingError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await?
        .map_err(map_capture_error)
}

fn map_capture_error(error: RecordingError) -> anyhow::Error {
    match error {
        RecordingError::DeviceDenied => anyhow::anyhow!(OrchestrationError::DeviceDenied),
        other => {
            tracing::error!("Capture failed: {other}");
            anyhow::anyhow!(other)
        }
    }
}

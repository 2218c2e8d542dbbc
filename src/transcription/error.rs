//! Error taxonomy surfaced by the transcription orchestrator.

use thiserror::Error;

/// Terminal outcome of a failed orchestration run (or of a collaborator the
/// caller reports through the same channel).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestrationError {
    #[error("Microphone access was denied. Allow audio capture and try again.")]
    DeviceDenied,

    #[error("You are not signed in. Run 'voxscribe login' first.")]
    NotAuthenticated,

    #[error("No Gemini API key configured. Run 'voxscribe auth' to add one.")]
    MissingCredential,

    #[error("No recording found. Record audio first.")]
    EmptyAudio,

    #[error("A transcription is already in progress.")]
    Busy,

    #[error("Quota exhausted on all models. Try again in {wait_seconds}s.")]
    QuotaExhausted { wait_seconds: u64 },

    #[error("{0}")]
    HardFailure(String),

    #[error("Failed to save recording: {0}")]
    StorageFailure(String),
}

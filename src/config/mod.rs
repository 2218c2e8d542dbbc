//! Configuration management for voxscribe.
//!
//! This module handles loading and saving application configuration from TOML files,
//! as well as local storage of the API key and session. Configuration is stored in the
//! user's config directory, while secrets are stored with restricted permissions
//! in the user's local data directory.

pub mod file;
pub mod secrets;

use std::path::PathBuf;

pub use file::{HistoryConfig, RecordingConfig, TranscriptionConfig, VoxConfig};
pub use secrets::{CredentialStore, SecretsFile};

/// Data directory for history, recordings, and secrets: `~/.local/share/voxscribe`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn data_dir() -> anyhow::Result<PathBuf> {
    let dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?
        .join(".local")
        .join("share")
        .join("voxscribe");
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

//! Configuration file management for voxscribe.
//!
//! This module handles loading and saving application configuration from TOML files.
//! The file is created with default values the first time it is loaded.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::transcription::api::{DEFAULT_RETRY_WAIT_SECS, GEMINI_BASE_URL};
use crate::transcription::machine::Timing;
use crate::transcription::model::{default_chain, ModelId};
use crate::transcription::policy::FallbackChain;
use crate::transcription::request::DEFAULT_PROMPT;

/// Most records the history keeps per user.
pub const MAX_HISTORY_RECORDS: usize = 10;

/// Transcription endpoint and fallback behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Models to try, most preferred first
    #[serde(default = "default_chain")]
    pub models: Vec<ModelId>,
    /// API root, without the `/models/...` suffix
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Cleanup instruction sent with every recording
    #[serde(default = "default_prompt")]
    pub prompt: String,
    /// Pause shown before switching to the next model, in milliseconds
    #[serde(default = "default_switch_pause_ms")]
    pub switch_pause_ms: u64,
    /// Wait used when a rate-limit response has no retry hint, in seconds
    #[serde(default = "default_wait_secs")]
    pub default_wait_secs: u64,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    GEMINI_BASE_URL.to_string()
}

fn default_prompt() -> String {
    DEFAULT_PROMPT.to_string()
}

fn default_switch_pause_ms() -> u64 {
    800
}

fn default_wait_secs() -> u64 {
    DEFAULT_RETRY_WAIT_SECS
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            models: default_chain(),
            base_url: default_base_url(),
            prompt: default_prompt(),
            switch_pause_ms: default_switch_pause_ms(),
            default_wait_secs: default_wait_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl TranscriptionConfig {
    /// Builds the fallback chain.
    ///
    /// # Errors
    /// - If `models` is empty
    pub fn chain(&self) -> anyhow::Result<FallbackChain> {
        FallbackChain::new(self.models.clone()).ok_or_else(|| {
            anyhow::anyhow!("No models configured. Add at least one entry to [transcription] models")
        })
    }

    pub fn timing(&self) -> Timing {
        Timing {
            switch_pause: Duration::from_millis(self.switch_pause_ms),
            ..Timing::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Audio capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingConfig {
    /// ffmpeg input format, e.g. "pulse", "alsa", "avfoundation", "dshow"
    #[serde(default = "default_input_format")]
    pub input_format: String,
    /// ffmpeg input device, e.g. "default" or ":0"
    #[serde(default = "default_input_device")]
    pub input_device: String,
}

fn default_input_format() -> String {
    if cfg!(target_os = "macos") {
        "avfoundation".to_string()
    } else if cfg!(target_os = "windows") {
        "dshow".to_string()
    } else {
        "pulse".to_string()
    }
}

fn default_input_device() -> String {
    if cfg!(target_os = "macos") {
        ":0".to_string()
    } else if cfg!(target_os = "windows") {
        "audio=default".to_string()
    } else {
        "default".to_string()
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            input_format: default_input_format(),
            input_device: default_input_device(),
        }
    }
}

/// History retention settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Records kept per user (1-10)
    #[serde(default = "default_max_records")]
    pub max_records: usize,
}

fn default_max_records() -> usize {
    MAX_HISTORY_RECORDS
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_records: default_max_records(),
        }
    }
}

impl HistoryConfig {
    /// Retention cap clamped to the supported range.
    pub fn cap(&self) -> usize {
        self.max_records.clamp(1, MAX_HISTORY_RECORDS)
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VoxConfig {
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
    #[serde(default)]
    pub history: HistoryConfig,
}

impl VoxConfig {
    /// Loads configuration from the user's config directory, writing the
    /// defaults first if the file does not exist yet.
    ///
    /// # Errors
    /// - If the config directory cannot be determined
    /// - If the config file cannot be read or created
    /// - If the TOML is malformed
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&get_config_path()?)
    }

    /// Loads configuration from `path`, creating it with defaults if missing.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            tracing::info!("Default configuration written to {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let config: VoxConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid configuration in {}: {e}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        tracing::debug!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// Path of the config file: `~/.config/voxscribe/voxscribe.toml`.
///
/// # Errors
/// - If the home directory cannot be determined
pub fn get_config_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".config").join("voxscribe").join("voxscribe.toml"))
}

//! Endpoint client: one HTTP call to one model, classified into an outcome.
//!
//! The orchestrator only sees the `EndpointClient` trait, so the retry machine
//! can be driven against a scripted client in tests without a live network.

mod gemini;

use async_trait::async_trait;
use regex::Regex;
use std::sync::OnceLock;

use super::model::ModelId;
use super::request::TranscriptionRequest;

pub use gemini::{GeminiClient, GEMINI_BASE_URL};

/// Wait used when a rate-limit response carries no retry hint.
pub const DEFAULT_RETRY_WAIT_SECS: u64 = 60;

/// Longest wait accepted from a retry hint.
pub const MAX_RETRY_WAIT_SECS: u64 = 3600;

/// Result of exactly one endpoint invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Success(String),
    RateLimited(u64),
    HardFailure(String),
}

/// Performs one transcription call against one model. Stateless between calls.
#[async_trait]
pub trait EndpointClient: Send + Sync {
    async fn call(&self, model: &ModelId, request: &TranscriptionRequest) -> AttemptOutcome;
}

/// Extracts the `retry in <N>s` hint from a provider error message.
///
/// Fractional seconds are rounded up and capped at [`MAX_RETRY_WAIT_SECS`]; a
/// missing or unparsable hint yields `default_secs`.
pub fn parse_retry_hint(message: &str, default_secs: u64) -> u64 {
    static RETRY_IN: OnceLock<Option<Regex>> = OnceLock::new();
    let Some(regex) = RETRY_IN
        .get_or_init(|| Regex::new(r"(?i)retry in ([\d.]+)s").ok())
        .as_ref()
    else {
        return default_secs;
    };

    regex
        .captures(message)
        .and_then(|caps| caps[1].parse::<f64>().ok())
        .filter(|secs| secs.is_finite() && *secs >= 0.0)
        .map(|secs| secs.ceil().min(MAX_RETRY_WAIT_SECS as f64) as u64)
        .unwrap_or(default_secs)
}

//! Model identifiers and the default fallback chain.
//!
//! A model identifier is an opaque name of one backend model variant. The chain
//! is ordered most-preferred first: the lightest models sit in their own quota
//! pools and are the most likely to still have free requests left.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of one backend transcription model variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Default model chain, most preferred first.
pub const DEFAULT_MODELS: [&str; 4] = [
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash-lite",
    "gemini-2.5-flash",
    "gemini-2.0-flash",
];

/// Returns the default chain as owned identifiers.
pub fn default_chain() -> Vec<ModelId> {
    DEFAULT_MODELS.iter().map(|id| ModelId::from(*id)).collect()
}

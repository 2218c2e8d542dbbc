//! Gemini API key management.
//!
//! Prompts for the key with masked input. Pressing Enter keeps an existing key;
//! `--clear` removes it.

use cliclack::{intro, note, outro, password};
use console::style;

use crate::config::{CredentialStore, SecretsFile};

/// Saves (or with `clear`, removes) the API key used for transcription.
///
/// # Errors
/// - If the prompt is cancelled
/// - If no key is entered and none is stored
/// - If the secrets file cannot be written
pub fn handle_auth(clear: bool) -> Result<(), anyhow::Error> {
    tracing::info!("=== voxscribe Authentication ===");
    let store = SecretsFile::open_default()?;

    if clear {
        store.clear()?;
        println!("{} API key removed", style("✓").green());
        return Ok(());
    }

    intro(style(" auth ").on_white().black())?;

    let current = store.get()?;
    if let Some(key) = &current {
        note("current key", mask(key))?;
    }

    let entered = if current.is_some() {
        password("Enter Gemini API key (press Enter to keep current):")
            .allow_empty()
            .interact()
    } else {
        password("Enter Gemini API key:").interact()
    }
    .map_err(|e| anyhow::anyhow!("API key input cancelled: {e}"))?;

    match (entered.trim(), current) {
        ("", Some(_)) => {
            outro("Kept the existing API key.")?;
        }
        ("", None) => return Err(anyhow::anyhow!("API key cannot be empty")),
        (key, _) => {
            store.set(key)?;
            outro(format!("API key saved to {}", store.path().display()))?;
        }
    }
    Ok(())
}

/// Shows only the last four characters of a key.
fn mask(key: &str) -> String {
    let visible: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("••••{visible}")
}

//! Local sign-in session.
//!
//! History records are scoped to a user, and transcription requires one. The
//! local session signs in as the operating-system account and remembers the
//! identity in the secrets file until `sign_out`.

use serde::{Deserialize, Serialize};

use crate::config::secrets::SecretsFile;

/// Signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identifier used to scope stored records
    pub id: String,
    pub display_name: String,
}

impl User {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }
}

pub trait AuthSession: Send + Sync {
    fn current_user(&self) -> Option<User>;
    fn sign_in(&self) -> anyhow::Result<User>;
    fn sign_out(&self) -> anyhow::Result<()>;
}

/// Session persisted next to the API key.
pub struct LocalSession {
    secrets: SecretsFile,
}

impl LocalSession {
    pub fn new(secrets: SecretsFile) -> Self {
        Self { secrets }
    }
}

impl AuthSession for LocalSession {
    fn current_user(&self) -> Option<User> {
        match self.secrets.read() {
            Ok(secrets) => secrets.user,
            Err(e) => {
                tracing::warn!("Failed to read session: {e}");
                None
            }
        }
    }

    fn sign_in(&self) -> anyhow::Result<User> {
        if let Some(user) = self.current_user() {
            return Ok(user);
        }
        let user = os_user()?;
        self.secrets.update(|s| s.user = Some(user.clone()))?;
        tracing::info!("Signed in as {}", user.id);
        Ok(user)
    }

    fn sign_out(&self) -> anyhow::Result<()> {
        self.secrets.update(|s| s.user = None)?;
        tracing::info!("Signed out");
        Ok(())
    }
}

/// Identity of the operating-system account running the process.
fn os_user() -> anyhow::Result<User> {
    let name = ["USER", "USERNAME", "LOGNAME"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| {
            dirs::home_dir()
                .and_then(|home| home.file_name().map(|n| n.to_string_lossy().to_string()))
        })
        .ok_or_else(|| anyhow::anyhow!("Could not determine the current user name"))?;

    Ok(User::new(user_id_for(&name), name))
}

/// Lowercase id with anything outside `[a-z0-9_-]` replaced by `_`.
fn user_id_for(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Fixed session for tests.
#[cfg(test)]
pub struct MemorySession(std::sync::Mutex<Option<User>>);

#[cfg(test)]
impl MemorySession {
    pub fn new(user: Option<User>) -> Self {
        Self(std::sync::Mutex::new(user))
    }
}

#[cfg(test)]
impl AuthSession for MemorySession {
    fn current_user(&self) -> Option<User> {
        self.0.lock().unwrap().clone()
    }

    fn sign_in(&self) -> anyhow::Result<User> {
        let mut user = self.0.lock().unwrap();
        Ok(user.get_or_insert_with(|| User::new("tester", "Tester")).clone())
    }

    fn sign_out(&self) -> anyhow::Result<()> {
        *self.0.lock().unwrap() = None;
        Ok(())
    }
}

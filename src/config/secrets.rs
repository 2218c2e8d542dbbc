//! Local storage for the API key and the signed-in identity.
//!
//! Secrets live in `~/.local/share/voxscribe/secrets.toml`, apart from the
//! editable config file, and are written with owner-only permissions on Unix.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::session::User;

/// On-disk layout of the secrets file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct Secrets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Read/write access to the configured API key.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> anyhow::Result<Option<String>>;
    fn set(&self, key: &str) -> anyhow::Result<()>;
    fn clear(&self) -> anyhow::Result<()>;
}

pub const SECRETS_FILE: &str = "secrets.toml";

/// Handle to the secrets file.
#[derive(Debug, Clone)]
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    /// Opens the secrets file in the user's data directory.
    ///
    /// # Errors
    /// - If the home directory cannot be determined
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Self::in_dir(&crate::config::data_dir()?))
    }

    /// Secrets file inside `data_dir`.
    pub fn in_dir(data_dir: &Path) -> Self {
        Self::at(data_dir.join(SECRETS_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn read(&self) -> anyhow::Result<Secrets> {
        if !self.path.exists() {
            return Ok(Secrets::default());
        }
        let content = fs::read_to_string(&self.path)
            .map_err(|e| anyhow::anyhow!("Failed to read secrets file: {e}"))?;
        toml::from_str(&content).map_err(|e| anyhow::anyhow!("Secrets file is corrupted: {e}"))
    }

    pub(crate) fn update(&self, apply: impl FnOnce(&mut Secrets)) -> anyhow::Result<()> {
        let mut secrets = self.read()?;
        apply(&mut secrets);

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, toml::to_string_pretty(&secrets)?)?;
        restrict_permissions(&self.path)?;
        Ok(())
    }
}

impl CredentialStore for SecretsFile {
    fn get(&self) -> anyhow::Result<Option<String>> {
        Ok(self.read()?.api_key.filter(|key| !key.trim().is_empty()))
    }

    fn set(&self, key: &str) -> anyhow::Result<()> {
        let key = key.trim();
        if key.is_empty() {
            return Err(anyhow::anyhow!("API key cannot be empty"));
        }
        self.update(|secrets| secrets.api_key = Some(key.to_string()))?;
        tracing::info!("API key saved");
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        self.update(|secrets| secrets.api_key = None)?;
        tracing::info!("API key removed");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

/// In-memory credential store for tests.
#[cfg(test)]
pub struct MemoryCredentials(std::sync::Mutex<Option<String>>);

#[cfg(test)]
impl MemoryCredentials {
    pub fn new(key: Option<String>) -> Self {
        Self(std::sync::Mutex::new(key))
    }
}

#[cfg(test)]
impl CredentialStore for MemoryCredentials {
    fn get(&self) -> anyhow::Result<Option<String>> {
        Ok(self.0.lock().unwrap().clone())
    }

    fn set(&self, key: &str) -> anyhow::Result<()> {
        *self.0.lock().unwrap() = Some(key.to_string());
        Ok(())
    }

    fn clear(&self) -> anyhow::Result<()> {
        *self.0.lock().unwrap() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_key_round_trips_through_file() {
        let dir = TempDir::new().unwrap();
        let store = SecretsFile::at(dir.path().join("secrets.toml"));

        assert_eq!(store.get().unwrap(), None);
        store.set("  AIza-test  ").unwrap();
        assert_eq!(store.get().unwrap().as_deref(), Some("AIza-test"));

        store.clear().unwrap();
        assert_eq!(store.get().unwrap(), None);
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SecretsFile::at(dir.path().join("secrets.toml"));
        assert!(store.set("   ").is_err());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_setting_key_keeps_signed_in_user() {
        let dir = TempDir::new().unwrap();
        let store = SecretsFile::at(dir.path().join("secrets.toml"));
        store
            .update(|s| s.user = Some(User::new("ada", "Ada")))
            .unwrap();

        store.set("key").unwrap();

        assert_eq!(store.read().unwrap().user, Some(User::new("ada", "Ada")));
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let store = SecretsFile::at(dir.path().join("secrets.toml"));
        store.set("key").unwrap();
        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}

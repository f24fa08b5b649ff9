use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::identity::Identity;

const SESSION_FILE: &str = "session.json";

/// File-based storage for the signed-in identity
/// The session is stored in the user's config directory
#[derive(Debug, Clone)]
pub struct SessionStorage {
    path: PathBuf,
}

impl SessionStorage {
    /// Storage at the default location (`<config dir>/weathernow/session.json`)
    pub fn default_location() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("weathernow");
        Ok(Self::in_dir(config_dir))
    }

    /// Storage inside a specific directory
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the identity, replacing any previous session
    pub fn store(&self, identity: &Identity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create session directory")?;
        }

        let json = serde_json::to_string_pretty(identity)
            .context("Failed to serialize session")?;

        fs::write(&self.path, &json).context("Failed to write session file")?;

        tracing::info!("Stored session for user {}", identity.uid);
        Ok(())
    }

    /// Load the persisted identity, or `None` if nobody is signed in
    pub fn load(&self) -> Result<Option<Identity>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).context("Failed to read session file")?;

        let identity: Identity =
            serde_json::from_str(&json).context("Failed to deserialize session")?;

        tracing::debug!("Loaded session for user {}", identity.uid);
        Ok(Some(identity))
    }

    /// Remove the persisted session
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).context("Failed to delete session file")?;
            tracing::info!("Cleared stored session");
        }

        Ok(())
    }
}

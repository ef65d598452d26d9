//! Session storage for persisting login state.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use filedeck_core::traits::{Backend, Session};
use filedeck_core::types::{BackendUrl, CollectionName};
use filedeck_core::{AuthToken, Record};

use super::{CliBackend, CliSession};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Stored session data.
#[derive(Debug, Serialize, Deserialize)]
struct StoredSession {
    url: String,
    collection: String,
    token: String,
    user: Record,
}

/// The login state shared by every command, kept in `session.json`.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store in the platform data directory.
    pub fn open() -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "filedeck")
            .context("Could not determine data directory")?;
        Ok(Self::at(dirs.data_dir().join("session.json")))
    }

    /// Store at an explicit path.
    pub fn at(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Save a session to disk.
    pub fn save(&self, session: &CliSession) -> Result<()> {
        let stored = StoredSession {
            url: session.backend_url().to_string(),
            collection: session.auth_collection().to_string(),
            token: session.token().as_str().to_string(),
            user: session.user(),
        };

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).context("Failed to create data directory")?;
        }

        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, &json).context("Failed to write session file")?;

        // Set restrictive permissions (Unix only)
        #[cfg(unix)]
        {
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        debug!(path = %self.path.display(), "Session saved");
        Ok(())
    }

    /// Load a session from disk, `None` if nobody is logged in.
    pub async fn load(&self) -> Result<Option<CliSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path).context("Failed to read session file")?;
        let stored: StoredSession = serde_json::from_str(&json).context("Invalid session file")?;

        let url = BackendUrl::new(&stored.url).context("Invalid backend URL in session")?;
        let collection =
            CollectionName::new(stored.collection).context("Invalid collection in session")?;

        let backend = CliBackend::new(url)?;
        let session = backend
            .restore(&collection, AuthToken::new(stored.token), stored.user)
            .await
            .context("Stored session is no longer valid. Run 'filedeck login' again.")?;

        Ok(Some(session))
    }

    /// Load a session, failing if nobody is logged in.
    pub async fn require(&self) -> Result<CliSession> {
        self.load()
            .await
            .context("Failed to load session")?
            .context("No active session. Run 'filedeck login' first.")
    }

    /// Clear the stored session. Returns false if there was none.
    pub fn clear(&self) -> Result<bool> {
        if !self.path.exists() {
            return Ok(false);
        }
        fs::remove_file(&self.path).context("Failed to remove session file")?;
        Ok(true)
    }
}

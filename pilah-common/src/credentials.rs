//! Local credential store
//!
//! Holds the identity id and bearer token written on login and removed on
//! logout. Absence of either value is a valid state (anonymous use), not an
//! error, so [`CredentialStore::load`] returns `Option`.

use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Identity id and bearer token for the scoring backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub user_id: String,
    pub token: String,
}

impl Credentials {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }

    /// Both values present and non-blank
    pub fn is_complete(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.token.trim().is_empty()
    }
}

/// JSON-file backed credential store
///
/// The file is re-read on every [`load`](Self::load) so that a login or
/// logout performed by another process is picked up without a restart.
/// All file access goes through `tokio::fs`.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored pair; `None` when missing, blank or unreadable
    pub async fn load(&self) -> Option<Credentials> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No credentials at {}", self.path.display());
                return None;
            }
            Err(e) => {
                warn!("Failed to read credentials from {}: {}", self.path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<Credentials>(&contents) {
            Ok(credentials) if credentials.is_complete() => Some(credentials),
            Ok(_) => {
                debug!("Credentials at {} are incomplete", self.path.display());
                None
            }
            Err(e) => {
                warn!("Ignoring malformed credentials at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Persist a credential pair (login)
    pub async fn save(&self, credentials: &Credentials) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let serialized = serde_json::to_string_pretty(credentials)?;
        fs::write(&self.path, serialized).await?;
        Ok(())
    }

    /// Remove the stored pair (logout); succeeds when nothing is stored
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

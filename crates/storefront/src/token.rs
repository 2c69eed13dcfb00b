//! Persisted access token.
//!
//! The only client state that outlives the process is one string, the access
//! token, stored under the fixed key [`TOKEN_KEY`]. Absence means logged out.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::api::AccessToken;

/// Key the token is stored under.
pub const TOKEN_KEY: &str = "accessToken";

/// Errors that can occur when reading or writing the persisted token.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token file {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Storage for the access token.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn load(&self) -> Result<Option<AccessToken>, TokenStoreError>;

    async fn save(&self, token: &AccessToken) -> Result<(), TokenStoreError>;

    /// Remove the token. Clearing an absent token is not an error.
    async fn clear(&self) -> Result<(), TokenStoreError>;
}

// =============================================================================
// FileTokenStore
// =============================================================================

/// Token persisted as a small JSON document (`{"accessToken": "..."}`).
///
/// The file is created with mode `0600` on unix.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> TokenStoreError {
        TokenStoreError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn load(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let mut entries: HashMap<String, String> =
            serde_json::from_str(&raw).map_err(|source| TokenStoreError::Corrupt {
                path: self.path.clone(),
                source,
            })?;

        Ok(entries
            .remove(TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(AccessToken::new))
    }

    async fn save(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let body = serde_json::json!({ TOKEN_KEY: token.expose() }).to_string();
        tokio::fs::write(&self.path, body)
            .await
            .map_err(|e| self.io_error(e))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(|e| self.io_error(e))?;
        }

        debug!(path = %self.path.display(), "Access token persisted");
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                debug!(path = %self.path.display(), "Access token removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}

// =============================================================================
// MemoryTokenStore
// =============================================================================

/// In-process token storage, for tests and embedders without a filesystem.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<AccessToken>>,
}

impl MemoryTokenStore {
    #[must_use]
    pub fn with_token(token: AccessToken) -> Self {
        Self {
            token: Mutex::new(Some(token)),
        }
    }

    /// Current value without going through the async trait.
    #[must_use]
    pub fn peek(&self) -> Option<AccessToken> {
        self.token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn set(&self, token: Option<AccessToken>) {
        *self
            .token
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = token;
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn load(&self) -> Result<Option<AccessToken>, TokenStoreError> {
        Ok(self.peek())
    }

    async fn save(&self, token: &AccessToken) -> Result<(), TokenStoreError> {
        self.set(Some(token.clone()));
        Ok(())
    }

    async fn clear(&self) -> Result<(), TokenStoreError> {
        self.set(None);
        Ok(())
    }
}

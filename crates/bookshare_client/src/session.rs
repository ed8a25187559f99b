//! crates/bookshare_client/src/session.rs
//!
//! The signed-in session and where it is persisted between launches.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::models::{AuthPayload, SessionUser};

/// Credentials for one signed-in user. Every authenticated API call borrows
/// one of these; there is no ambient token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: String,
    pub user: SessionUser,
}

impl From<AuthPayload> for Session {
    fn from(auth: AuthPayload) -> Self {
        Self {
            token: auth.token,
            user: auth.user,
        }
    }
}

//=========================================================================================
// Credential Storage
//=========================================================================================

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, ClientError>;
    async fn save(&self, session: &Session) -> Result<(), ClientError>;
    async fn clear(&self) -> Result<(), ClientError>;
}

/// Stores the session as a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn load(&self) -> Result<Option<Session>, ClientError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ClientError::Store(e.to_string())),
        };
        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // A corrupt file is treated as signed out.
                tracing::warn!("Discarding unreadable credentials at {:?}: {}", self.path, e);
                Ok(None)
            }
        }
    }

    async fn save(&self, session: &Session) -> Result<(), ClientError> {
        let raw = serde_json::to_vec(session).map_err(|e| ClientError::Store(e.to_string()))?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ClientError::Store(e.to_string()))?;
        }
        tokio::fs::write(&self.path, raw)
            .await
            .map_err(|e| ClientError::Store(e.to_string()))
    }

    async fn clear(&self) -> Result<(), ClientError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ClientError::Store(e.to_string())),
        }
    }
}

#[derive(Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Session>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<Session>> {
        self.slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn load(&self) -> Result<Option<Session>, ClientError> {
        Ok(self.slot().clone())
    }

    async fn save(&self, session: &Session) -> Result<(), ClientError> {
        *self.slot() = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        *self.slot() = None;
        Ok(())
    }
}

//=========================================================================================
// Session Context
//=========================================================================================

/// Owns the current session and keeps the store in step with it.
///
/// `init` restores whatever was persisted, `refresh` replaces it after a
/// register or login, and `clear` signs out.
pub struct SessionContext {
    store: Arc<dyn CredentialStore>,
    current: Option<Session>,
}

impl SessionContext {
    pub async fn init(store: Arc<dyn CredentialStore>) -> Result<Self, ClientError> {
        let current = store.load().await?;
        if current.is_some() {
            tracing::debug!("Restored persisted session");
        }
        Ok(Self { store, current })
    }

    pub async fn refresh(&mut self, auth: AuthPayload) -> Result<&Session, ClientError> {
        let session = Session::from(auth);
        self.store.save(&session).await?;
        Ok(self.current.insert(session))
    }

    pub async fn clear(&mut self) -> Result<(), ClientError> {
        self.current = None;
        self.store.clear().await
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// The current session, or `NotAuthenticated`.
    pub fn require(&self) -> Result<&Session, ClientError> {
        self.current.as_ref().ok_or(ClientError::NotAuthenticated)
    }
}

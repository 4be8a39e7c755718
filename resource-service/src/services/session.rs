//! Typed persistence for the admin session.
//!
//! The file layout keeps the two string entries a browser client would hold in
//! local storage: the serialized user object and the admin flag.

use crate::models::Session;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Session>, SessionError>;
    async fn save(&self, session: &Session) -> Result<(), SessionError>;
    async fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredEntries {
    /// JSON-encoded [`StoredUser`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    /// `"true"` or `"false"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    admin: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredUser {
    display_name: String,
}

impl StoredEntries {
    fn from_session(session: &Session) -> Result<Self, SessionError> {
        let user = serde_json::to_string(&StoredUser {
            display_name: session.display_name.clone(),
        })?;
        Ok(Self {
            user: Some(user),
            admin: Some(session.is_admin.to_string()),
        })
    }

    fn into_session(self) -> Result<Option<Session>, SessionError> {
        let Some(user) = self.user else {
            return Ok(None);
        };
        let user: StoredUser = serde_json::from_str(&user)?;
        Ok(Some(Session {
            display_name: user.display_name,
            is_admin: self.admin.as_deref() == Some("true"),
        }))
    }
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStore for FileSessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let entries: StoredEntries = serde_json::from_slice(&raw)?;
        entries.into_session()
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(&StoredEntries::from_session(session)?)?;

        // Write-then-rename so a crash never leaves a half-written file.
        let staging = self.path.with_extension("tmp");
        tokio::fs::write(&staging, body).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self.session.lock().await.clone())
    }

    async fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self.session.lock().await = Some(session.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), SessionError> {
        *self.session.lock().await = None;
        Ok(())
    }
}

//! Shared-password admin authentication.
//!
//! There is a single admin password whose hash (Argon2, or bcrypt from older
//! deployments) lives in the remote tree. The service loads it once, verifies login attempts against it and
//! keeps the resulting session in a [`SessionStore`].

use super::session::{SessionError, SessionStore};
use crate::config::AuthSettings;
use crate::models::Session;
use crate::store::{PathError, RemoteStore, StoreError, StorePath};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::instrument;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Password is required")]
    PasswordRequired,

    #[error("Authentication system not ready. Please try again.")]
    NotReady,

    #[error("Invalid password")]
    InvalidCredentials,

    #[error("Admin session required")]
    NotAuthorized,

    #[error("Passwords do not match")]
    PasswordMismatch,

    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthState {
    /// The stored hash has not been fetched yet.
    Uninitialized,
    Ready,
    /// The hash could not be loaded; logins are refused.
    Unavailable,
}

enum HashState {
    Uninitialized,
    Ready(PasswordHashString),
    Unavailable,
}

pub struct AuthService {
    store: Arc<dyn RemoteStore>,
    sessions: Arc<dyn SessionStore>,
    hash_path: StorePath,
    min_password_length: usize,
    hash: RwLock<HashState>,
    session: RwLock<Option<Session>>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        sessions: Arc<dyn SessionStore>,
        settings: &AuthSettings,
    ) -> Result<Self, AuthError> {
        let hash_path = StorePath::parse(&settings.admin_hash_path)?;
        if hash_path.is_root() {
            return Err(PathError::EmptySegment.into());
        }
        Ok(Self {
            store,
            sessions,
            hash_path,
            min_password_length: settings.min_password_length,
            hash: RwLock::new(HashState::Uninitialized),
            session: RwLock::new(None),
        })
    }

    /// Fetch the admin hash. Reads the store directly: the hash sits under the
    /// reserved member, which sanitized snapshots never expose.
    pub async fn initialize(&self) -> AuthState {
        let next = match self.store.get(&self.hash_path).await {
            Ok(Some(Value::String(hash))) if !hash.is_empty() => {
                tracing::info!("Admin password hash loaded");
                HashState::Ready(PasswordHashString::new(hash))
            }
            Ok(_) => {
                tracing::warn!(path = %self.hash_path, "No admin password hash stored");
                HashState::Unavailable
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to load admin password hash");
                HashState::Unavailable
            }
        };
        *self.hash.write().await = next;
        self.state().await
    }

    pub async fn state(&self) -> AuthState {
        match &*self.hash.read().await {
            HashState::Uninitialized => AuthState::Uninitialized,
            HashState::Ready(_) => AuthState::Ready,
            HashState::Unavailable => AuthState::Unavailable,
        }
    }

    /// Bring back a session persisted by an earlier run. A corrupt session
    /// file is discarded.
    pub async fn restore(&self) -> Result<Option<Session>, AuthError> {
        let restored = match self.sessions.load().await {
            Ok(session) => session,
            Err(SessionError::Corrupt(e)) => {
                tracing::warn!(error = %e, "Discarding corrupt session");
                self.sessions.clear().await?;
                None
            }
            Err(e) => return Err(e.into()),
        };

        if let Some(session) = &restored {
            tracing::info!(is_admin = session.is_admin, "Session restored");
        }
        *self.session.write().await = restored.clone();
        Ok(restored)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, password: Password) -> Result<Session, AuthError> {
        if password.is_empty() {
            return Err(AuthError::PasswordRequired);
        }

        let hash = match &*self.hash.read().await {
            HashState::Ready(hash) => hash.clone(),
            _ => return Err(AuthError::NotReady),
        };

        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?;
        let matches = verified.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Stored admin hash could not be checked");
            false
        });

        if !matches {
            tracing::warn!("Admin login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let session = Session::administrator();
        self.sessions.save(&session).await?;
        *self.session.write().await = Some(session.clone());

        tracing::info!("Admin logged in");
        Ok(session)
    }

    pub async fn logout(&self) -> Result<(), AuthError> {
        self.sessions.clear().await?;
        *self.session.write().await = None;
        tracing::info!("Logged out");
        Ok(())
    }

    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        new_password: Password,
        confirm_password: Password,
    ) -> Result<(), AuthError> {
        if !self.is_admin().await {
            return Err(AuthError::NotAuthorized);
        }
        if new_password.as_str() != confirm_password.as_str() {
            return Err(AuthError::PasswordMismatch);
        }
        if new_password.len() < self.min_password_length {
            return Err(AuthError::PasswordTooShort(self.min_password_length));
        }

        let hash = tokio::task::spawn_blocking(move || hash_password(&new_password))
            .await
            .map_err(|e| AuthError::Hashing(e.to_string()))?
            .map_err(|e| AuthError::Hashing(e.to_string()))?;

        let (parent, key) = match (self.hash_path.parent(), self.hash_path.last()) {
            (Some(parent), Some(key)) => (parent, key.to_string()),
            _ => return Err(PathError::EmptySegment.into()),
        };
        let mut children = Map::new();
        children.insert(key, Value::String(hash.as_str().to_string()));

        self.store.update(&parent, children).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to store new admin password hash");
            e
        })?;

        *self.hash.write().await = HashState::Ready(hash);
        tracing::info!("Admin password changed");
        Ok(())
    }

    pub async fn current_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    pub async fn is_admin(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|session| session.is_admin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::session::MemorySessionStore;
    use crate::store::MemoryStore;
    use serde_json::json;

    const PASSWORD: &str = "library-admin";

    fn seeded_store() -> Arc<MemoryStore> {
        let hash = hash_password(&Password::new(PASSWORD)).unwrap();
        Arc::new(MemoryStore::new(json!({
            "auth": { "admin": hash.as_str() },
            "CSE": {}
        })))
    }

    fn service(store: Arc<MemoryStore>, sessions: Arc<MemorySessionStore>) -> AuthService {
        AuthService::new(store, sessions, &AuthSettings::default()).unwrap()
    }

    #[tokio::test]
    async fn test_login_before_initialize_is_not_ready() {
        let auth = service(seeded_store(), Arc::new(MemorySessionStore::new()));
        assert_eq!(auth.state().await, AuthState::Uninitialized);

        let result = auth.login(Password::new(PASSWORD)).await;
        assert!(matches!(result, Err(AuthError::NotReady)));
    }

    #[tokio::test]
    async fn test_missing_hash_is_unavailable() {
        let store = Arc::new(MemoryStore::new(json!({ "CSE": {} })));
        let auth = service(store, Arc::new(MemorySessionStore::new()));

        assert_eq!(auth.initialize().await, AuthState::Unavailable);
        let result = auth.login(Password::new(PASSWORD)).await;
        assert!(matches!(result, Err(AuthError::NotReady)));
    }

    #[tokio::test]
    async fn test_empty_password_is_required() {
        let auth = service(seeded_store(), Arc::new(MemorySessionStore::new()));
        auth.initialize().await;

        let result = auth.login(Password::new("")).await;
        assert!(matches!(result, Err(AuthError::PasswordRequired)));
    }

    #[tokio::test]
    async fn test_wrong_password_leaves_session_untouched() {
        let sessions = Arc::new(MemorySessionStore::new());
        let auth = service(seeded_store(), sessions.clone());
        auth.initialize().await;

        let result = auth.login(Password::new("guess")).await;
        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
        assert!(!auth.is_admin().await);
        assert_eq!(sessions.load().await.unwrap(), None);
    }

    fn store_with_hash(hash: &str) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(json!({ "auth": { "admin": hash }, "CSE": {} })))
    }

    #[tokio::test]
    async fn test_login_against_bcrypt_hash() {
        let hash = bcrypt::hash(PASSWORD, 4).unwrap().replacen("$2b$", "$2a$", 1);
        let auth = service(store_with_hash(&hash), Arc::new(MemorySessionStore::new()));
        assert_eq!(auth.initialize().await, AuthState::Ready);

        assert!(matches!(
            auth.login(Password::new("guess")).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(auth.login(Password::new(PASSWORD)).await.is_ok());
        assert!(auth.is_admin().await);
    }

    #[tokio::test]
    async fn test_unreadable_hash_rejects_login() {
        for hash in ["not-a-phc-string", "$2a$10$tooshort"] {
            let sessions = Arc::new(MemorySessionStore::new());
            let auth = service(store_with_hash(hash), sessions.clone());
            auth.initialize().await;

            let result = auth.login(Password::new(PASSWORD)).await;
            assert!(matches!(result, Err(AuthError::InvalidCredentials)));
            assert_eq!(sessions.load().await.unwrap(), None);
        }
    }

    #[tokio::test]
    async fn test_login_persists_session() {
        let sessions = Arc::new(MemorySessionStore::new());
        let auth = service(seeded_store(), sessions.clone());
        assert_eq!(auth.initialize().await, AuthState::Ready);

        let session = auth.login(Password::new(PASSWORD)).await.unwrap();
        assert_eq!(session, Session::administrator());
        assert!(auth.is_admin().await);
        assert_eq!(sessions.load().await.unwrap(), Some(Session::administrator()));

        auth.logout().await.unwrap();
        assert!(!auth.is_admin().await);
        assert_eq!(sessions.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_restore_session() {
        let sessions = Arc::new(MemorySessionStore::with_session(Session::administrator()));
        let auth = service(seeded_store(), sessions);

        assert!(!auth.is_admin().await);
        let restored = auth.restore().await.unwrap();
        assert!(restored.is_some());
        assert!(auth.is_admin().await);
    }

    #[tokio::test]
    async fn test_change_password_requires_admin() {
        let auth = service(seeded_store(), Arc::new(MemorySessionStore::new()));
        auth.initialize().await;

        let result = auth
            .change_password(Password::new("new-secret"), Password::new("new-secret"))
            .await;
        assert!(matches!(result, Err(AuthError::NotAuthorized)));
    }

    #[tokio::test]
    async fn test_change_password_validation() {
        let auth = service(seeded_store(), Arc::new(MemorySessionStore::new()));
        auth.initialize().await;
        auth.login(Password::new(PASSWORD)).await.unwrap();

        let result = auth
            .change_password(Password::new("new-secret"), Password::new("other"))
            .await;
        assert!(matches!(result, Err(AuthError::PasswordMismatch)));

        let result = auth
            .change_password(Password::new("abc"), Password::new("abc"))
            .await;
        assert!(matches!(result, Err(AuthError::PasswordTooShort(6))));
    }

    #[tokio::test]
    async fn test_change_password_rotates_hash() {
        let store = seeded_store();
        let auth = service(store.clone(), Arc::new(MemorySessionStore::new()));
        auth.initialize().await;
        auth.login(Password::new(PASSWORD)).await.unwrap();

        auth.change_password(Password::new("new-secret"), Password::new("new-secret"))
            .await
            .unwrap();

        let stored = store.tree().await["auth"]["admin"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(verify_password(
            &Password::new("new-secret"),
            &PasswordHashString::new(stored)
        )
        .unwrap());

        assert!(matches!(
            auth.login(Password::new(PASSWORD)).await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(auth.login(Password::new("new-secret")).await.is_ok());
    }
}

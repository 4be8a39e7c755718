//! Services layer: the data repository over the remote tree, admin
//! authentication and session persistence.

pub mod auth;
pub mod patch_queue;
pub mod repository;
pub mod session;

pub use auth::{AuthError, AuthService, AuthState};
pub use repository::{DataRepository, DataState, RepositoryError};
pub use session::{FileSessionStore, MemorySessionStore, SessionError, SessionStore};

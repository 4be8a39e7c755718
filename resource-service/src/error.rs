use crate::services::{AuthError, RepositoryError, SessionError};
use crate::store::{PathError, StoreError};
use service_core::error::AppError;

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Connectivity(msg) => AppError::BadGateway(msg),
            StoreError::Status { status, message } => {
                AppError::BadGateway(format!("remote store returned {}: {}", status, message))
            }
            StoreError::Decode(msg) => AppError::BadGateway(msg),
            StoreError::Path(e) => e.into(),
        }
    }
}

impl From<PathError> for AppError {
    fn from(err: PathError) -> Self {
        AppError::BadRequest(anyhow::Error::new(err))
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Store(e) => e.into(),
            RepositoryError::Path(e) => e.into(),
            RepositoryError::Validation(e) => AppError::ValidationError(e),
            RepositoryError::Invalid(msg) => AppError::BadRequest(anyhow::anyhow!(msg)),
            RepositoryError::DocumentNotFound(path) => {
                AppError::NotFound(anyhow::anyhow!("Document {} not found", path))
            }
            RepositoryError::NotReady => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::InternalError(anyhow::Error::new(err))
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotReady => AppError::ServiceUnavailable(err.to_string()),
            AuthError::InvalidCredentials => AppError::AuthError(anyhow::anyhow!("Invalid password")),
            AuthError::NotAuthorized => AppError::Unauthorized(anyhow::anyhow!("Admin session required")),
            AuthError::PasswordRequired
            | AuthError::PasswordMismatch
            | AuthError::PasswordTooShort(_) => AppError::BadRequest(anyhow::anyhow!(err.to_string())),
            AuthError::Store(e) => e.into(),
            AuthError::Path(e) => e.into(),
            AuthError::Session(e) => e.into(),
            AuthError::Hashing(msg) => AppError::InternalError(anyhow::anyhow!(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_connectivity_is_bad_gateway() {
        let err: AppError = RepositoryError::Store(StoreError::Connectivity("down".into())).into();
        assert_eq!(err.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_not_ready_is_distinct_from_wrong_password() {
        let not_ready: AppError = AuthError::NotReady.into();
        let wrong: AppError = AuthError::InvalidCredentials.into();
        assert_eq!(not_ready.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_reserved_path_is_bad_request() {
        let err: AppError = RepositoryError::Path(PathError::Reserved("auth".into())).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_writes_before_first_tree_are_unavailable() {
        let err: AppError = RepositoryError::NotReady.into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_missing_document_is_not_found() {
        let err: AppError = RepositoryError::DocumentNotFound("CSE/x".into()).into();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}

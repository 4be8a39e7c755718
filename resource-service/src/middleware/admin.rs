use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use service_core::error::AppError;

use crate::AppState;

/// Let the request through only while an admin session is active.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !state.auth.is_admin().await {
        tracing::warn!(uri = %request.uri(), "Rejected admin request without admin session");
        return Err(AppError::Unauthorized(anyhow::anyhow!(
            "Admin session required"
        )));
    }

    Ok(next.run(request).await)
}

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use service_core::error::AppError;

use crate::dtos::auth::{ChangePasswordRequest, LoginRequest, SessionResponse};
use crate::dtos::MessageResponse;
use crate::utils::{Password, ValidatedJson};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.auth.login(Password::new(req.password)).await?;

    Ok((
        StatusCode::OK,
        Json(SessionResponse {
            authenticated: true,
            auth_state: state.auth.state().await,
            session: Some(session),
        }),
    ))
}

pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.auth.logout().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to clear session");
        e
    })?;

    Ok(Json(MessageResponse::new("Logged out")))
}

pub async fn current_session(State(state): State<AppState>) -> Json<SessionResponse> {
    let session = state.auth.current_session().await;
    Json(SessionResponse {
        authenticated: session.is_some(),
        auth_state: state.auth.state().await,
        session,
    })
}

pub async fn change_password(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    state
        .auth
        .change_password(
            Password::new(req.new_password),
            Password::new(req.confirm_password),
        )
        .await?;

    Ok(Json(MessageResponse::new("Password updated")))
}

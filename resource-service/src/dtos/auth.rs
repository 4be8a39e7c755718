use crate::models::Session;
use crate::services::AuthState;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An empty password is let through so the service can answer with its own
/// "Password is required" error.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "New password is required"))]
    pub new_password: String,

    #[validate(length(min = 1, message = "Please confirm the new password"))]
    pub confirm_password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub auth_state: AuthState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

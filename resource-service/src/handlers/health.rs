use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let data = state.repository.state();
    Json(json!({
        "status": "ok",
        "service": "resource-service",
        "version": env!("CARGO_PKG_VERSION"),
        "dataLoaded": !data.loading,
        "dataError": data.error,
        "authState": state.auth.state().await,
    }))
}

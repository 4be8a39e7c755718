use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use service_core::error::AppError;

use super::current_snapshot;
use crate::dtos::subjects::{NextKeyResponse, SubjectList};
use crate::AppState;

pub async fn subject_departments(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(json!({ "departments": snapshot.subject_departments() })))
}

pub async fn subject_categories(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> Result<Json<Value>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(json!({
        "department": department,
        "categories": snapshot.subject_categories(&department),
    })))
}

pub async fn subjects(
    State(state): State<AppState>,
    Path((department, category)): Path<(String, String)>,
) -> Result<Json<SubjectList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    let subjects = snapshot.subjects(&department, &category);
    Ok(Json(SubjectList {
        department,
        category,
        subjects,
    }))
}

pub async fn next_subject_key(
    State(state): State<AppState>,
    Path((department, category)): Path<(String, String)>,
) -> Result<Json<NextKeyResponse>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(NextKeyResponse {
        next_key: snapshot.next_subject_key(&department, &category),
    }))
}

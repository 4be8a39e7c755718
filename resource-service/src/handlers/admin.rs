//! Admin tree editing. Every route here sits behind
//! [`require_admin`](crate::middleware::require_admin).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::dtos::documents::CreateDocumentRequest;
use crate::dtos::subjects::{
    CreateSubjectCategoryRequest, CreateSubjectDepartmentRequest, CreateSubjectRequest,
};
use crate::dtos::MessageResponse;
use crate::models::{DocumentFields, DocumentLocation};
use crate::utils::ValidatedJson;
use crate::AppState;

pub async fn create_document(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateDocumentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let location = req.location();
    let document = state
        .repository
        .add_document(&location, req.fields)
        .await?;

    Ok((StatusCode::CREATED, Json(document)))
}

pub async fn update_department_document(
    State(state): State<AppState>,
    Path((department, id)): Path<(String, String)>,
    ValidatedJson(fields): ValidatedJson<DocumentFields>,
) -> Result<impl IntoResponse, AppError> {
    let location = DocumentLocation::department(department);
    let document = state
        .repository
        .update_document(&location, &id, fields)
        .await?;
    Ok(Json(document))
}

pub async fn delete_department_document(
    State(state): State<AppState>,
    Path((department, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let location = DocumentLocation::department(department);
    state.repository.delete_document(&location, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn update_sub_department_document(
    State(state): State<AppState>,
    Path((sub_department, id)): Path<(String, String)>,
    ValidatedJson(fields): ValidatedJson<DocumentFields>,
) -> Result<impl IntoResponse, AppError> {
    let location = special_location(&state, sub_department);
    let document = state
        .repository
        .update_document(&location, &id, fields)
        .await?;
    Ok(Json(document))
}

pub async fn delete_sub_department_document(
    State(state): State<AppState>,
    Path((sub_department, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let location = special_location(&state, sub_department);
    state.repository.delete_document(&location, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_subject_department(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateSubjectDepartmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let department = req.department.trim();
    state.repository.add_subject_department(department).await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!(
            "Department {} added",
            department
        ))),
    ))
}

pub async fn delete_subject_department(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .repository
        .delete_subject_department(&department)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_subject_category(
    State(state): State<AppState>,
    Path(department): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateSubjectCategoryRequest>,
) -> Result<impl IntoResponse, AppError> {
    let category = req.category.trim();
    state
        .repository
        .add_subject_category(&department, category)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::new(format!("Category {} added", category))),
    ))
}

pub async fn delete_subject_category(
    State(state): State<AppState>,
    Path((department, category)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .repository
        .delete_subject_category(&department, &category)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_subject(
    State(state): State<AppState>,
    Path((department, category)): Path<(String, String)>,
    ValidatedJson(req): ValidatedJson<CreateSubjectRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subject = state
        .repository
        .add_subject(&department, &category, req.key.as_deref(), &req.name)
        .await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

pub async fn delete_subject(
    State(state): State<AppState>,
    Path((department, category, key)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .repository
        .delete_subject(&department, &category, &key)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

fn special_location(state: &AppState, sub_department: String) -> DocumentLocation {
    DocumentLocation::sub_department(state.config.tree.special_department.clone(), sub_department)
}

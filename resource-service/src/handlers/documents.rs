use axum::{
    extract::{Path, Query, State},
    Json,
};
use service_core::error::AppError;

use super::current_snapshot;
use crate::dtos::documents::{DepartmentList, DocumentList, RecentQuery};
use crate::models::{Document, DocumentLocation, SearchFacets, SearchQuery};
use crate::AppState;

/// Number of documents on the home page.
const DEFAULT_RECENT_LIMIT: usize = 6;

pub async fn list_departments(
    State(state): State<AppState>,
) -> Result<Json<DepartmentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(DepartmentList {
        departments: snapshot.departments(),
    }))
}

pub async fn department_documents(
    State(state): State<AppState>,
    Path(department): Path<String>,
) -> Result<Json<DocumentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(snapshot.documents_by_department(&department).into()))
}

pub async fn department_semester_documents(
    State(state): State<AppState>,
    Path((department, semester)): Path<(String, String)>,
) -> Result<Json<DocumentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(
        snapshot.documents_by_semester(&department, &semester).into(),
    ))
}

pub async fn department_document(
    State(state): State<AppState>,
    Path((department, id)): Path<(String, String)>,
) -> Result<Json<Document>, AppError> {
    find_document(&state, DocumentLocation::department(department), &id)
}

pub async fn list_sub_departments(
    State(state): State<AppState>,
) -> Result<Json<DepartmentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(DepartmentList {
        departments: snapshot.sub_departments(),
    }))
}

pub async fn sub_department_documents(
    State(state): State<AppState>,
    Path(sub_department): Path<String>,
) -> Result<Json<DocumentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(
        snapshot.documents_by_sub_department(&sub_department).into(),
    ))
}

pub async fn sub_department_document(
    State(state): State<AppState>,
    Path((sub_department, id)): Path<(String, String)>,
) -> Result<Json<Document>, AppError> {
    let location =
        DocumentLocation::sub_department(state.config.tree.special_department.clone(), sub_department);
    find_document(&state, location, &id)
}

pub async fn category_documents(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<DocumentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(snapshot.documents_by_category(&category).into()))
}

pub async fn recent_documents(
    State(state): State<AppState>,
    Query(query): Query<RecentQuery>,
) -> Result<Json<DocumentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT);
    Ok(Json(snapshot.recent_documents(limit).into()))
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<DocumentList>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(snapshot.search(&query).into()))
}

pub async fn search_facets(
    State(state): State<AppState>,
) -> Result<Json<SearchFacets>, AppError> {
    let snapshot = current_snapshot(&state)?;
    Ok(Json(snapshot.facets()))
}

fn find_document(
    state: &AppState,
    location: DocumentLocation,
    id: &str,
) -> Result<Json<Document>, AppError> {
    let snapshot = current_snapshot(state)?;
    snapshot
        .document(&location, id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Document not found")))
}

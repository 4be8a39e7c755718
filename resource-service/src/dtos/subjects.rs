use crate::models::Subject;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectDepartmentRequest {
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectCategoryRequest {
    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSubjectRequest {
    #[validate(length(min = 1, message = "Subject name is required"))]
    pub name: String,

    /// Generated as `SUB-n` when omitted.
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SubjectList {
    pub department: String,
    pub category: String,
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NextKeyResponse {
    pub next_key: String,
}

use crate::models::{Document, DocumentFields, DocumentLocation};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Serialize, Deserialize)]
pub struct DocumentList {
    pub count: usize,
    pub documents: Vec<Document>,
}

impl From<Vec<Document>> for DocumentList {
    fn from(documents: Vec<Document>) -> Self {
        Self {
            count: documents.len(),
            documents,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DepartmentList {
    pub departments: Vec<String>,
}

/// Body of `POST /admin/documents`: where to file the document plus its
/// attributes.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    #[validate(length(min = 1, message = "Department is required"))]
    pub department: String,

    #[serde(default)]
    pub sub_department: Option<String>,

    #[serde(flatten)]
    #[validate(nested)]
    pub fields: DocumentFields,
}

impl CreateDocumentRequest {
    pub fn location(&self) -> DocumentLocation {
        DocumentLocation {
            department: self.department.trim().to_string(),
            sub_department: self
                .sub_department
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RecentQuery {
    pub limit: Option<usize>,
}

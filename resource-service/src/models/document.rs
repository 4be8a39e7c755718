use crate::config::TreeLayout;
use crate::store::{PathError, StorePath};
use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use validator::Validate;

/// Keys the accessor layer assigns itself; stored copies are ignored.
const DERIVED_KEYS: [&str; 3] = ["id", "department", "subDepartment"];

/// A shared study resource as surfaced to readers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Store-assigned key.
    pub id: String,
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_department: Option<String>,
    #[serde(flatten)]
    pub fields: DocumentFields,
}

/// The attributes stored under a document key. Every attribute is optional in
/// the tree; unknown attributes are carried through untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFields {
    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(length(min = 1, max = 256))]
    pub document_name: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub subject: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub category: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub academic_year: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub semester: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_by: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub published_date: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_string",
        skip_serializing_if = "Option::is_none"
    )]
    #[validate(url)]
    pub drive_link: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Tree values are loosely typed: numbers and booleans are rendered as text,
/// anything structured is dropped.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

impl DocumentFields {
    /// Parse the attributes of one stored document. Non-object entries yield `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut fields: DocumentFields = serde_json::from_value(Value::Object(object.clone())).ok()?;
        for key in DERIVED_KEYS {
            fields.extra.remove(key);
        }
        Some(fields)
    }

    /// Serialized form written to the store. Absent attributes are omitted so a
    /// shallow update never clears them, and derived keys are never persisted.
    pub fn to_value(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()));
        if let Value::Object(object) = &mut value {
            for key in DERIVED_KEYS {
                object.remove(key);
            }
        }
        value
    }

    pub fn has_name(&self) -> bool {
        self.document_name
            .as_deref()
            .is_some_and(|name| !name.trim().is_empty())
    }
}

impl Document {
    pub fn from_entry(
        id: &str,
        department: &str,
        sub_department: Option<&str>,
        value: &Value,
    ) -> Option<Self> {
        let fields = DocumentFields::from_value(value)?;
        Some(Self {
            id: id.to_string(),
            department: department.to_string(),
            sub_department: sub_department.map(str::to_string),
            fields,
        })
    }

    pub fn location(&self) -> DocumentLocation {
        DocumentLocation {
            department: self.department.clone(),
            sub_department: self.sub_department.clone(),
        }
    }

    /// Published date as a calendar date. Accepts `YYYY-MM-DD` and RFC 3339.
    pub fn published_on(&self) -> Option<NaiveDate> {
        let raw = self.fields.published_date.as_deref()?.trim();
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
    }
}

/// Where a document lives: a department and, for the special department, a
/// sub-department.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLocation {
    pub department: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_department: Option<String>,
}

impl DocumentLocation {
    pub fn department(department: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            sub_department: None,
        }
    }

    pub fn sub_department(department: impl Into<String>, sub: impl Into<String>) -> Self {
        Self {
            department: department.into(),
            sub_department: Some(sub.into()),
        }
    }

    /// Store path of the collection holding this location's documents.
    ///
    /// The sub-department segment only applies to the special department and
    /// is required there.
    pub fn collection_path(&self, layout: &TreeLayout) -> Result<StorePath, PathError> {
        if self.department == layout.reserved_key || self.department == layout.subject_catalog_key
        {
            return Err(PathError::Reserved(self.department.clone()));
        }

        let path = StorePath::root().child(&self.department)?;
        if self.department != layout.special_department {
            return Ok(path);
        }

        match self.sub_department.as_deref() {
            Some(sub) if sub == layout.reserved_key => Err(PathError::Reserved(sub.to_string())),
            Some(sub) => path.child(sub),
            None => Err(PathError::MissingSegment(format!(
                "{} documents need a sub-department",
                self.department
            ))),
        }
    }

    pub fn document_path(&self, layout: &TreeLayout, id: &str) -> Result<StorePath, PathError> {
        if id == layout.reserved_key {
            return Err(PathError::Reserved(id.to_string()));
        }
        self.collection_path(layout)?.child(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fields_from_value() {
        let value = json!({
            "documentName": "Notes",
            "category": "Notes",
            "academicYear": 2023,
            "semester": "S3",
            "driveLink": "https://drive.example.com/file",
            "pages": 12,
        });

        let fields = DocumentFields::from_value(&value).unwrap();
        assert_eq!(fields.document_name.as_deref(), Some("Notes"));
        assert_eq!(fields.academic_year.as_deref(), Some("2023"));
        assert_eq!(fields.extra.get("pages"), Some(&json!(12)));
    }

    #[test]
    fn test_fields_from_non_object() {
        assert!(DocumentFields::from_value(&json!("stray")).is_none());
        assert!(DocumentFields::from_value(&json!(null)).is_none());
    }

    #[test]
    fn test_stored_identity_keys_ignored() {
        let value = json!({ "documentName": "Notes", "id": "spoofed", "department": "X" });
        let doc = Document::from_entry("doc1", "CSE", None, &value).unwrap();
        assert_eq!(doc.id, "doc1");
        assert_eq!(doc.department, "CSE");
        assert!(doc.fields.extra.is_empty());

        let wire = serde_json::to_value(&doc).unwrap();
        assert_eq!(wire["id"], "doc1");
        assert_eq!(wire["department"], "CSE");
        assert!(wire.get("subDepartment").is_none());
    }

    #[test]
    fn test_to_value_skips_absent_fields() {
        let fields = DocumentFields {
            document_name: Some("Lab Manual".to_string()),
            ..Default::default()
        };
        assert_eq!(fields.to_value(), json!({ "documentName": "Lab Manual" }));
    }

    #[test]
    fn test_to_value_drops_identity_keys() {
        let mut fields = DocumentFields {
            document_name: Some("Notes".to_string()),
            ..Default::default()
        };
        fields.extra.insert("id".to_string(), json!("spoofed"));
        fields.extra.insert("subDepartment".to_string(), json!("Management"));
        fields.extra.insert("pages".to_string(), json!(4));

        assert_eq!(
            fields.to_value(),
            json!({ "documentName": "Notes", "pages": 4 })
        );
    }

    #[test]
    fn test_validation() {
        let mut fields = DocumentFields {
            document_name: Some("Notes".to_string()),
            drive_link: Some("not a link".to_string()),
            ..Default::default()
        };
        assert!(fields.validate().is_err());

        fields.drive_link = Some("https://drive.example.com/x".to_string());
        assert!(fields.validate().is_ok());
    }

    #[test]
    fn test_published_on() {
        let mut doc = Document::default();
        doc.fields.published_date = Some("2024-03-01".to_string());
        assert_eq!(doc.published_on(), NaiveDate::from_ymd_opt(2024, 3, 1));

        doc.fields.published_date = Some("2024-03-01T10:00:00Z".to_string());
        assert_eq!(doc.published_on(), NaiveDate::from_ymd_opt(2024, 3, 1));

        doc.fields.published_date = Some("last week".to_string());
        assert_eq!(doc.published_on(), None);
    }

    #[test]
    fn test_collection_paths() {
        let layout = TreeLayout::default();

        let plain = DocumentLocation::department("CSE");
        assert_eq!(plain.collection_path(&layout).unwrap().to_string(), "CSE");

        let nested = DocumentLocation::sub_department("OEC", "Management");
        assert_eq!(
            nested.document_path(&layout, "doc1").unwrap().to_string(),
            "OEC/Management/doc1"
        );

        // The sub-department is ignored outside the special department.
        let stray = DocumentLocation::sub_department("ECE", "Ignored");
        assert_eq!(stray.collection_path(&layout).unwrap().to_string(), "ECE");
    }

    #[test]
    fn test_collection_path_rejections() {
        let layout = TreeLayout::default();

        assert!(matches!(
            DocumentLocation::department("OEC").collection_path(&layout),
            Err(PathError::MissingSegment(_))
        ));
        assert!(matches!(
            DocumentLocation::department("auth").collection_path(&layout),
            Err(PathError::Reserved(_))
        ));
        assert!(matches!(
            DocumentLocation::department("Subjects").collection_path(&layout),
            Err(PathError::Reserved(_))
        ));
        assert!(matches!(
            DocumentLocation::department("CSE").document_path(&layout, "auth"),
            Err(PathError::Reserved(_))
        ));
    }
}

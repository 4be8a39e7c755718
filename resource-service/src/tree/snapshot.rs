use super::sanitize::strip_reserved;
use crate::config::TreeLayout;
use crate::models::{Document, DocumentLocation, SearchFacets, SearchQuery, Subject};
use serde_json::{Map, Value};
use std::cmp::Reverse;
use std::sync::Arc;

/// Category name that selects every document.
pub const ALL_DOCUMENTS_CATEGORY: &str = "all documents";

const SUBJECT_KEY_PREFIX: &str = "SUB-";

/// Immutable, sanitized view of the tree at one point in time.
///
/// Construction strips the reserved member at every depth, so nothing read
/// through a snapshot can surface it. Cloning is cheap.
#[derive(Debug, Clone)]
pub struct Snapshot {
    tree: Arc<Value>,
    layout: Arc<TreeLayout>,
}

impl Snapshot {
    pub fn new(raw: &Value, layout: Arc<TreeLayout>) -> Self {
        let mut tree = raw.clone();
        strip_reserved(&mut tree, &layout.reserved_key);
        Self::from_sanitized(tree, layout)
    }

    pub fn empty(layout: Arc<TreeLayout>) -> Self {
        Self::from_sanitized(Value::Object(Map::new()), layout)
    }

    /// Wrap a tree that already went through [`strip_reserved`].
    pub(crate) fn from_sanitized(tree: Value, layout: Arc<TreeLayout>) -> Self {
        Self {
            tree: Arc::new(tree),
            layout,
        }
    }

    pub fn tree(&self) -> &Value {
        &self.tree
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub fn is_empty(&self) -> bool {
        self.root().map_or(true, Map::is_empty)
    }

    fn root(&self) -> Option<&Map<String, Value>> {
        self.tree.as_object()
    }

    fn child<'a>(node: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a Map<String, Value>> {
        node?.get(key)?.as_object()
    }

    /// Every top-level key except the subject catalog.
    pub fn departments(&self) -> Vec<String> {
        self.root()
            .map(|root| {
                root.keys()
                    .filter(|key| **key != self.layout.subject_catalog_key)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Sub-departments of the special department.
    pub fn sub_departments(&self) -> Vec<String> {
        Self::child(self.root(), &self.layout.special_department)
            .map(|dept| {
                dept.iter()
                    .filter(|(_, value)| value.is_object())
                    .map(|(key, _)| key.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Flattened documents of one department. The special department's
    /// sub-departments are walked and each record tagged with both names.
    /// An unknown department yields an empty list.
    pub fn documents_by_department(&self, department: &str) -> Vec<Document> {
        if department == self.layout.subject_catalog_key {
            return Vec::new();
        }
        let Some(entries) = Self::child(self.root(), department) else {
            return Vec::new();
        };

        if department == self.layout.special_department {
            entries
                .iter()
                .filter_map(|(sub, docs)| Some((sub, docs.as_object()?)))
                .flat_map(|(sub, docs)| {
                    docs.iter().filter_map(move |(id, value)| {
                        Document::from_entry(id, department, Some(sub), value)
                    })
                })
                .collect()
        } else {
            entries
                .iter()
                .filter_map(|(id, value)| Document::from_entry(id, department, None, value))
                .collect()
        }
    }

    pub fn documents_by_sub_department(&self, sub_department: &str) -> Vec<Document> {
        let department = &self.layout.special_department;
        Self::child(Self::child(self.root(), department), sub_department)
            .map(|docs| {
                docs.iter()
                    .filter_map(|(id, value)| {
                        Document::from_entry(id, department, Some(sub_department), value)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn all_documents(&self) -> Vec<Document> {
        self.departments()
            .iter()
            .flat_map(|dept| self.documents_by_department(dept))
            .collect()
    }

    pub fn document(&self, location: &DocumentLocation, id: &str) -> Option<Document> {
        let path = location.document_path(&self.layout, id).ok()?;
        let value = path.lookup(&self.tree)?;
        let sub = if location.department == self.layout.special_department {
            location.sub_department.as_deref()
        } else {
            None
        };
        Document::from_entry(id, &location.department, sub, value)
    }

    /// Case-insensitive category match; [`ALL_DOCUMENTS_CATEGORY`] selects everything.
    pub fn documents_by_category(&self, category: &str) -> Vec<Document> {
        let wanted = category.trim().to_lowercase();
        let all = self.all_documents();
        if wanted == ALL_DOCUMENTS_CATEGORY {
            return all;
        }
        all.into_iter()
            .filter(|doc| {
                doc.fields
                    .category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase() == wanted)
            })
            .collect()
    }

    pub fn documents_by_semester(&self, department: &str, semester: &str) -> Vec<Document> {
        self.documents_by_department(department)
            .into_iter()
            .filter(|doc| doc.fields.semester.as_deref() == Some(semester))
            .collect()
    }

    /// Newest published first; undated documents follow in tree order.
    pub fn recent_documents(&self, limit: usize) -> Vec<Document> {
        let mut docs = self.all_documents();
        docs.sort_by_key(|doc| Reverse(doc.published_on()));
        docs.truncate(limit);
        docs
    }

    pub fn search(&self, query: &SearchQuery) -> Vec<Document> {
        self.all_documents()
            .into_iter()
            .filter(|doc| query.matches(doc))
            .collect()
    }

    pub fn facets(&self) -> SearchFacets {
        SearchFacets::collect(&self.all_documents())
    }

    fn subject_catalog(&self) -> Option<&Map<String, Value>> {
        Self::child(self.root(), &self.layout.subject_catalog_key)
    }

    pub fn subject_departments(&self) -> Vec<String> {
        self.subject_catalog()
            .map(|catalog| catalog.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Categories (semesters or course types) of one catalog department.
    pub fn subject_categories(&self, department: &str) -> Vec<String> {
        Self::child(self.subject_catalog(), department)
            .map(|dept| dept.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn subjects(&self, department: &str, category: &str) -> Vec<Subject> {
        Self::child(Self::child(self.subject_catalog(), department), category)
            .map(|subjects| {
                subjects
                    .iter()
                    .filter_map(|(key, name)| Some(Subject::new(key, name.as_str()?)))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_subject_department(&self, department: &str) -> bool {
        Self::child(self.subject_catalog(), department).is_some()
    }

    pub fn has_subject_category(&self, department: &str, category: &str) -> bool {
        Self::child(Self::child(self.subject_catalog(), department), category).is_some()
    }

    /// `SUB-n` where `n` is one past the highest trailing number among the
    /// category's existing keys.
    pub fn next_subject_key(&self, department: &str, category: &str) -> String {
        next_key_among(Self::child(
            Self::child(self.subject_catalog(), department),
            category,
        ))
    }
}

/// `SUB-n` key one past the highest numbered key in `subjects`.
pub(crate) fn next_key_among(subjects: Option<&Map<String, Value>>) -> String {
    let highest = subjects
        .map(|subjects| {
            subjects
                .keys()
                .filter_map(|key| trailing_number(key))
                .max()
                .unwrap_or(0)
        })
        .unwrap_or(0);
    format!("{}{}", SUBJECT_KEY_PREFIX, highest.saturating_add(1))
}

fn trailing_number(key: &str) -> Option<u64> {
    let digits_start = key
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map(|(i, _)| i)?;
    key[digits_start..].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(raw: Value) -> Snapshot {
        Snapshot::new(&raw, Arc::new(TreeLayout::default()))
    }

    fn sample() -> Snapshot {
        snapshot(json!({
            "auth": { "admin": "$argon2id$v=19$secret" },
            "CSE": {
                "auth": "marker",
                "doc1": {
                    "documentName": "Data Structures Notes",
                    "category": "Notes",
                    "semester": "S3",
                    "academicYear": "2023",
                    "publishedBy": "Anu",
                    "publishedDate": "2024-01-10",
                    "auth": "nested"
                },
                "doc2": {
                    "documentName": "DBMS Question Paper",
                    "category": "Question Papers",
                    "semester": "S4",
                    "publishedDate": "2024-05-02"
                }
            },
            "ECE": {
                "doc3": { "documentName": "Signals", "category": "notes", "subject": "Signals and Systems" }
            },
            "OEC": {
                "auth": {},
                "Management": {
                    "doc4": { "documentName": "Finance Basics", "category": "Notes", "publishedDate": "2023-12-31" }
                },
                "Humanities": {
                    "doc5": { "documentName": "Ethics", "category": "Syllabus" },
                    "stray": "not a document"
                }
            },
            "Subjects": {
                "CSE": {
                    "S3": { "SUB-1": "Data Structures", "SUB-7": "Discrete Maths", "misc": "Other" },
                    "S4": {}
                },
                "OEC": { "Open": { "SUB-2": "Finance" } }
            }
        }))
    }

    #[test]
    fn test_scenario_single_department() {
        let snap = snapshot(json!({
            "CSE": { "doc1": { "documentName": "Notes", "category": "Notes" } },
            "Subjects": {}
        }));
        assert_eq!(snap.departments(), vec!["CSE"]);

        let docs = snap.documents_by_department("CSE");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc1");
        assert_eq!(docs[0].department, "CSE");
        assert_eq!(docs[0].fields.document_name.as_deref(), Some("Notes"));
    }

    #[test]
    fn test_departments_exclude_catalog_and_reserved() {
        assert_eq!(sample().departments(), vec!["CSE", "ECE", "OEC"]);
    }

    #[test]
    fn test_reserved_member_never_surfaces() {
        let snap = sample();
        assert!(!crate::tree::sanitize::contains_reserved(snap.tree(), "auth"));
        for doc in snap.all_documents() {
            assert_ne!(doc.id, "auth");
            assert!(!doc.fields.extra.contains_key("auth"));
            assert_ne!(doc.sub_department.as_deref(), Some("auth"));
        }
        assert!(!snap.sub_departments().contains(&"auth".to_string()));
    }

    #[test]
    fn test_special_department_is_flattened_and_tagged() {
        let docs = sample().documents_by_department("OEC");
        assert_eq!(docs.len(), 2);
        for doc in &docs {
            assert_eq!(doc.department, "OEC");
            assert!(doc.sub_department.is_some());
        }
        let finance = docs.iter().find(|d| d.id == "doc4").unwrap();
        assert_eq!(finance.sub_department.as_deref(), Some("Management"));
    }

    #[test]
    fn test_sub_departments() {
        let snap = sample();
        assert_eq!(snap.sub_departments(), vec!["Humanities", "Management"]);
        let docs = snap.documents_by_sub_department("Humanities");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc5");
        assert!(snap.documents_by_sub_department("Nope").is_empty());
    }

    #[test]
    fn test_missing_department_is_empty() {
        let snap = sample();
        assert!(snap.documents_by_department("MECH").is_empty());
        assert!(snap.documents_by_department("Subjects").is_empty());
        assert!(snapshot(json!(null)).departments().is_empty());
        assert!(snapshot(json!(null)).all_documents().is_empty());
    }

    #[test]
    fn test_all_documents_and_lookup() {
        let snap = sample();
        assert_eq!(snap.all_documents().len(), 5);

        let doc = snap
            .document(&DocumentLocation::sub_department("OEC", "Management"), "doc4")
            .unwrap();
        assert_eq!(doc.fields.document_name.as_deref(), Some("Finance Basics"));
        assert!(snap
            .document(&DocumentLocation::department("CSE"), "missing")
            .is_none());
        assert!(snap
            .document(&DocumentLocation::department("CSE"), "auth")
            .is_none());
    }

    #[test]
    fn test_category_filter() {
        let snap = sample();
        let notes = snap.documents_by_category("NOTES");
        let ids: Vec<&str> = notes.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc1", "doc3", "doc4"]);
        assert_eq!(snap.documents_by_category("All Documents").len(), 5);
        assert!(snap.documents_by_category("Lab Manuals").is_empty());
    }

    #[test]
    fn test_semester_filter() {
        let docs = sample().documents_by_semester("CSE", "S4");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "doc2");
    }

    #[test]
    fn test_recent_documents() {
        let recent = sample().recent_documents(3);
        let ids: Vec<&str> = recent.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["doc2", "doc1", "doc4"]);

        let everything = sample().recent_documents(10);
        assert_eq!(everything.len(), 5);
        assert_eq!(everything[3].id, "doc3");
        assert_eq!(everything[4].id, "doc5");
    }

    #[test]
    fn test_search() {
        let snap = sample();
        let hits = snap.search(&SearchQuery::text("signals"));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "doc3");

        let query = SearchQuery {
            department: "CSE".to_string(),
            academic_year: "2023".to_string(),
            ..Default::default()
        };
        let hits = snap.search(&query);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "doc1");
    }

    #[test]
    fn test_facets() {
        let facets = sample().facets();
        assert_eq!(facets.departments.len(), 3);
        assert!(facets.categories.contains("Notes"));
        assert!(facets.categories.contains("notes"));
    }

    #[test]
    fn test_subject_catalog() {
        let snap = sample();
        assert_eq!(snap.subject_departments(), vec!["CSE", "OEC"]);
        assert_eq!(snap.subject_categories("CSE"), vec!["S3", "S4"]);
        assert!(snap.subject_categories("ECE").is_empty());

        let subjects = snap.subjects("CSE", "S3");
        assert_eq!(subjects.len(), 3);
        assert!(subjects.contains(&Subject::new("SUB-7", "Discrete Maths")));
        assert!(snap.subjects("CSE", "S4").is_empty());
        assert!(snap.has_subject_category("CSE", "S4"));
        assert!(!snap.has_subject_department("ME"));
    }

    #[test]
    fn test_next_subject_key() {
        let snap = sample();
        assert_eq!(snap.next_subject_key("CSE", "S3"), "SUB-8");
        assert_eq!(snap.next_subject_key("CSE", "S4"), "SUB-1");
        assert_eq!(snap.next_subject_key("ME", "S1"), "SUB-1");
    }

    #[test]
    fn test_trailing_number() {
        assert_eq!(trailing_number("SUB-12"), Some(12));
        assert_eq!(trailing_number("CS101"), Some(101));
        assert_eq!(trailing_number("misc"), None);
    }
}

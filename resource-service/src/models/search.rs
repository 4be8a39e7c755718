use super::Document;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Free-text query plus exact-match filters. Empty strings mean "any".
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchQuery {
    pub q: String,
    pub department: String,
    pub category: String,
    pub semester: String,
    pub academic_year: String,
}

impl SearchQuery {
    pub fn text(q: impl Into<String>) -> Self {
        Self {
            q: q.into(),
            ..Default::default()
        }
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.matches_text(doc)
            && filter_matches(&self.department, Some(doc.department.as_str()))
            && filter_matches(&self.category, doc.fields.category.as_deref())
            && filter_matches(&self.semester, doc.fields.semester.as_deref())
            && filter_matches(&self.academic_year, doc.fields.academic_year.as_deref())
    }

    /// Case-insensitive substring match on name, subject and publisher.
    fn matches_text(&self, doc: &Document) -> bool {
        let needle = self.q.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            doc.fields.document_name.as_deref(),
            doc.fields.subject.as_deref(),
            doc.fields.published_by.as_deref(),
        ]
        .into_iter()
        .flatten()
        .any(|haystack| haystack.to_lowercase().contains(&needle))
    }
}

fn filter_matches(filter: &str, value: Option<&str>) -> bool {
    filter.is_empty() || value == Some(filter)
}

/// Distinct filter values present across a document set.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SearchFacets {
    pub departments: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub semesters: BTreeSet<String>,
    pub academic_years: BTreeSet<String>,
}

impl SearchFacets {
    pub fn collect<'a>(documents: impl IntoIterator<Item = &'a Document>) -> Self {
        let mut facets = Self::default();
        for doc in documents {
            facets.departments.insert(doc.department.clone());
            insert_present(&mut facets.categories, &doc.fields.category);
            insert_present(&mut facets.semesters, &doc.fields.semester);
            insert_present(&mut facets.academic_years, &doc.fields.academic_year);
        }
        facets
    }
}

fn insert_present(set: &mut BTreeSet<String>, value: &Option<String>) {
    if let Some(v) = value.as_deref().filter(|v| !v.is_empty()) {
        set.insert(v.to_string());
    }
}

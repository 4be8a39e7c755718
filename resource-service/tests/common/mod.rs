//! Test helpers: a router wired to an in-memory store seeded with a small
//! library.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use resource_service::config::ResourceConfig;
use resource_service::services::MemorySessionStore;
use resource_service::startup::build_router;
use resource_service::store::MemoryStore;
use resource_service::utils::{hash_password, Password};
use resource_service::AppState;
use serde_json::{json, Value};
use std::sync::{Arc, OnceLock};
use tower::util::ServiceExt;

pub const ADMIN_PASSWORD: &str = "library-admin";

static ADMIN_HASH: OnceLock<String> = OnceLock::new();

pub fn admin_hash() -> &'static str {
    ADMIN_HASH.get_or_init(|| {
        hash_password(&Password::new(ADMIN_PASSWORD))
            .expect("Failed to hash admin password")
            .into_string()
    })
}

/// Keys are listed in sorted order so iteration order does not depend on
/// serde_json's map implementation.
pub fn seed_tree() -> Value {
    json!({
        "CSE": {
            "doc1": {
                "documentName": "Data Structures Notes",
                "subject": "Data Structures",
                "category": "Notes",
                "academicYear": "2023",
                "semester": "S3",
                "publishedBy": "Anu",
                "publishedDate": "2024-01-10",
                "driveLink": "https://drive.example.com/ds"
            },
            "doc2": {
                "documentName": "Compiler Design QP",
                "subject": "Compilers",
                "category": "Question Papers",
                "academicYear": "2022",
                "semester": "S6",
                "publishedBy": "Ravi",
                "publishedDate": "2024-03-02",
                "driveLink": "https://drive.example.com/cd"
            }
        },
        "ECE": {
            "doc3": {
                "documentName": "Signals Notes",
                "subject": "Signals",
                "category": "notes",
                "academicYear": "2023",
                "semester": "S3",
                "publishedBy": "Meera",
                "publishedDate": "2023-11-20"
            }
        },
        "OEC": {
            "Management": {
                "doc4": {
                    "documentName": "Principles of Management",
                    "category": "Notes",
                    "semester": "S7",
                    "publishedDate": "2024-02-15"
                }
            }
        },
        "Subjects": {
            "CSE": {
                "S3": { "SUB-1": "Data Structures", "SUB-2": "Discrete Maths" }
            }
        },
        "auth": { "admin": admin_hash() }
    })
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub state: AppState,
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(seed_tree()).await
}

pub async fn spawn_app_with(tree: Value) -> TestApp {
    let store = Arc::new(MemoryStore::new(tree));
    let state = AppState::initialize(
        ResourceConfig::default(),
        store.clone(),
        Arc::new(MemorySessionStore::new()),
    )
    .await
    .expect("Failed to initialize app state");

    TestApp {
        router: build_router(state.clone()),
        store,
        state,
    }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn login(&self) {
        let (status, _) = self
            .request(
                Method::POST,
                "/auth/login",
                Some(json!({ "password": ADMIN_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }
}

pub fn document_ids(body: &Value) -> Vec<String> {
    body["documents"]
        .as_array()
        .map(|docs| {
            docs.iter()
                .filter_map(|doc| doc["id"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

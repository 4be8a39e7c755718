use crate::config::{HttpSettings, ResourceConfig, StoreBackend};
use crate::handlers::{admin, auth, documents, health, subjects};
use crate::middleware::require_admin;
use crate::services::{AuthService, DataRepository, FileSessionStore, SessionStore};
use crate::store::{MemoryStore, RemoteStore, RestStore};
use axum::{
    http::{HeaderValue, Method, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;
use service_core::error::AppError;
use service_core::middleware::{
    request_id_middleware, security_headers_middleware, REQUEST_ID_HEADER,
};
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub config: ResourceConfig,
    pub repository: Arc<DataRepository>,
    pub auth: Arc<AuthService>,
}

impl AppState {
    /// Wire the repository and auth service over `store`, load the first tree,
    /// the admin hash and any persisted session. A store that cannot be reached
    /// yet is logged and left to the feed to recover.
    pub async fn initialize(
        config: ResourceConfig,
        store: Arc<dyn RemoteStore>,
        sessions: Arc<dyn SessionStore>,
    ) -> Result<Self, AppError> {
        let repository =
            DataRepository::new(store.clone(), config.tree.clone(), config.patching);
        if let Err(e) = repository.refresh().await {
            tracing::warn!(error = %e, "Initial tree load failed");
        }

        let auth = Arc::new(AuthService::new(store, sessions, &config.auth)?);
        let auth_state = auth.initialize().await;
        if let Err(e) = auth.restore().await {
            tracing::warn!(error = %e, "Could not restore persisted session");
        }
        tracing::info!(auth_state = ?auth_state, "Services initialized");

        Ok(Self {
            config,
            repository,
            auth,
        })
    }
}

pub struct Application {
    port: u16,
    server: Box<dyn std::future::Future<Output = std::io::Result<()>> + Send + Unpin>,
    state: AppState,
    _tasks: Vec<JoinHandle<()>>,
}

impl Application {
    pub async fn build(config: ResourceConfig) -> Result<Self, AppError> {
        let mut tasks = Vec::new();

        let store: Arc<dyn RemoteStore> = match config.store.backend {
            StoreBackend::Memory => match &config.store.seed_path {
                Some(path) => Arc::new(MemoryStore::from_file(path).await.map_err(|e| {
                    tracing::error!("Failed to seed in-memory store: {}", e);
                    AppError::from(e)
                })?),
                None => Arc::new(MemoryStore::empty()),
            },
            StoreBackend::Rest => {
                let rest = Arc::new(RestStore::new(&config.store).map_err(|e| {
                    tracing::error!("Failed to configure remote store: {}", e);
                    AppError::from(e)
                })?);
                tasks.push(rest.start_polling(config.store.poll_interval()));
                rest
            }
        };

        let sessions: Arc<dyn SessionStore> =
            Arc::new(FileSessionStore::new(config.session.path.clone()));

        let state = AppState::initialize(config.clone(), store, sessions).await?;
        tasks.push(state.repository.start());

        let app = build_router(state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind TCP listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Listening on {}", port);

        let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal());

        Ok(Self {
            port,
            server: Box::new(server.into_future()),
            state,
            _tasks: tasks,
        })
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        self.server.await
    }
}

pub fn build_router(state: AppState) -> Router {
    let admin_routes = Router::new()
        .route("/documents", post(admin::create_document))
        .route(
            "/documents/:department/:id",
            put(admin::update_department_document).delete(admin::delete_department_document),
        )
        .route(
            "/oec/:sub_department/documents/:id",
            put(admin::update_sub_department_document)
                .delete(admin::delete_sub_department_document),
        )
        .route("/subjects", post(admin::create_subject_department))
        .route(
            "/subjects/:department",
            post(admin::create_subject_category).delete(admin::delete_subject_department),
        )
        .route(
            "/subjects/:department/:category",
            post(admin::create_subject).delete(admin::delete_subject_category),
        )
        .route(
            "/subjects/:department/:category/:key",
            delete(admin::delete_subject),
        )
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/departments", get(documents::list_departments))
        .route(
            "/departments/:department/documents",
            get(documents::department_documents),
        )
        .route(
            "/departments/:department/documents/:id",
            get(documents::department_document),
        )
        .route(
            "/departments/:department/semesters/:semester/documents",
            get(documents::department_semester_documents),
        )
        .route("/oec", get(documents::list_sub_departments))
        .route(
            "/oec/:sub_department/documents",
            get(documents::sub_department_documents),
        )
        .route(
            "/oec/:sub_department/documents/:id",
            get(documents::sub_department_document),
        )
        .route(
            "/categories/:category/documents",
            get(documents::category_documents),
        )
        .route("/documents/recent", get(documents::recent_documents))
        .route("/search", get(documents::search))
        .route("/search/facets", get(documents::search_facets))
        .route("/subjects", get(subjects::subject_departments))
        .route("/subjects/:department", get(subjects::subject_categories))
        .route("/subjects/:department/:category", get(subjects::subjects))
        .route(
            "/subjects/:department/:category/next-key",
            get(subjects::next_subject_key),
        )
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::current_session))
        .route("/auth/password", put(auth::change_password))
        .nest("/admin", admin_routes)
        .fallback(not_found)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.http))
        .with_state(state)
}

fn cors_layer(settings: &HttpSettings) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    if settings.allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = settings
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", origin, e);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT, starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}

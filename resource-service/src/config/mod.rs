use secrecy::Secret;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::path::PathBuf;
use std::time::Duration;

/// Full service configuration: the shared core settings plus the
/// resource-specific sections.
#[derive(Clone)]
pub struct ResourceConfig {
    pub common: core_config::Config,
    pub store: StoreSettings,
    pub tree: TreeLayout,
    pub auth: AuthSettings,
    pub session: SessionSettings,
    pub patching: PatchSettings,
    pub http: HttpSettings,
}

#[derive(Deserialize, Default)]
struct ResourceSections {
    #[serde(default)]
    store: StoreSettings,
    #[serde(default)]
    tree: TreeLayout,
    #[serde(default)]
    auth: AuthSettings,
    #[serde(default)]
    session: SessionSettings,
    #[serde(default)]
    patching: PatchSettings,
    #[serde(default)]
    http: HttpSettings,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Rest,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "rest" => Ok(StoreBackend::Rest),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(default)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// Base URL of the hosted realtime database (REST backend only).
    pub url: Option<String>,
    /// Database secret or ID token, sent as the `auth` query parameter.
    pub auth_token: Option<Secret<String>>,
    /// JSON file used to seed the in-memory backend.
    pub seed_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            url: None,
            auth_token: None,
            seed_path: None,
            poll_interval_ms: 5_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl StoreSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(100))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Shape of the realtime tree.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TreeLayout {
    /// Department whose documents sit one level deeper, under sub-departments.
    pub special_department: String,
    /// Top-level key holding the subject catalog rather than documents.
    pub subject_catalog_key: String,
    /// Member name reserved for administrative data; never surfaced.
    pub reserved_key: String,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self {
            special_department: "OEC".to_string(),
            subject_catalog_key: "Subjects".to_string(),
            reserved_key: "auth".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// Store path of the shared admin password hash.
    pub admin_hash_path: String,
    pub min_password_length: usize,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            admin_hash_path: "auth/admin".to_string(),
            min_password_length: 6,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub path: PathBuf,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from("session.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct PatchSettings {
    /// Inbound snapshots an unconfirmed optimistic patch survives.
    pub max_pending_snapshots: u32,
}

impl Default for PatchSettings {
    fn default() -> Self {
        Self {
            max_pending_snapshots: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Browser origins allowed by CORS. Empty allows any origin.
    pub allowed_origins: Vec<String>,
}

impl ResourceConfig {
    pub fn load() -> Result<Self, AppError> {
        // Load common config (handles .env and APP__ prefix)
        let common = core_config::Config::load()?;

        let sections: ResourceSections = core_config::builder().build()?.try_deserialize()?;

        let config = ResourceConfig {
            common,
            store: sections.store,
            tree: sections.tree,
            auth: sections.auth,
            session: sections.session,
            patching: sections.patching,
            http: sections.http,
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if self.store.backend == StoreBackend::Rest && self.store.url.is_none() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "store.url is required when store.backend is rest"
            )));
        }
        let layout = &self.tree;
        if layout.reserved_key == layout.subject_catalog_key
            || layout.reserved_key == layout.special_department
        {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "tree.reserved_key must differ from the catalog key and special department"
            )));
        }
        Ok(())
    }
}

impl Default for ResourceConfig {
    fn default() -> Self {
        let sections = ResourceSections::default();
        Self {
            common: core_config::Config::default(),
            store: sections.store,
            tree: sections.tree,
            auth: sections.auth,
            session: sections.session,
            patching: sections.patching,
            http: sections.http,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout() {
        let layout = TreeLayout::default();
        assert_eq!(layout.special_department, "OEC");
        assert_eq!(layout.subject_catalog_key, "Subjects");
        assert_eq!(layout.reserved_key, "auth");
    }

    #[test]
    fn test_backend_from_str() {
        assert_eq!("REST".parse::<StoreBackend>().unwrap(), StoreBackend::Rest);
        assert_eq!(
            "memory".parse::<StoreBackend>().unwrap(),
            StoreBackend::Memory
        );
        assert!("mongo".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_rest_backend_requires_url() {
        let mut config = ResourceConfig::default();
        config.store.backend = StoreBackend::Rest;
        assert!(config.validate().is_err());

        config.store.url = Some("https://example.firebaseio.com".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sections_fill_missing_fields() {
        let sections: ResourceSections = config::Config::builder()
            .set_override("store.poll_interval_ms", 250)
            .unwrap()
            .set_override("tree.special_department", "OPEN")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(sections.store.poll_interval_ms, 250);
        assert_eq!(sections.store.request_timeout_ms, 10_000);
        assert_eq!(sections.tree.special_department, "OPEN");
        assert_eq!(sections.tree.subject_catalog_key, "Subjects");
        assert_eq!(sections.patching.max_pending_snapshots, 3);
    }
}

//! Data-access layer over the remote tree.
//!
//! Readers receive immutable [`Snapshot`]s through a `watch` channel. Writers
//! go through the methods below, which talk to the store and then patch the
//! local view optimistically via the [`PatchQueue`].

use super::patch_queue::{PatchOp, PatchQueue};
use crate::config::{PatchSettings, TreeLayout};
use crate::models::{Document, DocumentFields, DocumentLocation, Subject};
use crate::store::{PathError, RemoteStore, StoreError, StorePath, TreeEvent};
use crate::tree::{sanitize::contains_reserved, sanitized, snapshot::next_key_among, Snapshot};
use serde_json::{Map, Value};
use std::sync::{Arc, Weak};
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::instrument;
use validator::Validate;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error(transparent)]
    Validation(#[from] validator::ValidationErrors),

    #[error("Document {0} not found")]
    DocumentNotFound(String),

    #[error("Data is still loading. Please try again.")]
    NotReady,
}

/// What readers observe: the latest snapshot plus feed status.
#[derive(Debug, Clone)]
pub struct DataState {
    pub snapshot: Snapshot,
    /// No tree has been received yet.
    pub loading: bool,
    /// Last feed failure, cleared by the next good tree.
    pub error: Option<String>,
}

pub struct DataRepository {
    store: Arc<dyn RemoteStore>,
    layout: Arc<TreeLayout>,
    state: watch::Sender<DataState>,
    patches: Mutex<PatchQueue>,
}

impl DataRepository {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        layout: TreeLayout,
        settings: PatchSettings,
    ) -> Arc<Self> {
        let layout = Arc::new(layout);
        let (state, _) = watch::channel(DataState {
            snapshot: Snapshot::empty(layout.clone()),
            loading: true,
            error: None,
        });
        Arc::new(Self {
            store,
            layout,
            state,
            patches: Mutex::new(PatchQueue::new(settings.max_pending_snapshots)),
        })
    }

    /// Follow the store's tree feed until the repository is dropped.
    pub fn start(self: &Arc<Self>) -> JoinHandle<()> {
        let mut feed = self.store.subscribe();
        let weak: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            loop {
                let event = feed.borrow_and_update().clone();
                let Some(repository) = weak.upgrade() else {
                    break;
                };
                repository.handle_event(event).await;
                drop(repository);

                if feed.changed().await.is_err() {
                    break;
                }
            }
            tracing::debug!("Tree feed closed");
        })
    }

    /// Read the whole tree once and publish it.
    pub async fn refresh(&self) -> Result<Snapshot, RepositoryError> {
        match self.store.get_tree().await {
            Ok(tree) => {
                self.ingest(&tree).await;
                Ok(self.snapshot())
            }
            Err(e) => {
                self.record_failure(e.to_string());
                Err(e.into())
            }
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.state.borrow().snapshot.clone()
    }

    pub fn state(&self) -> DataState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DataState> {
        self.state.subscribe()
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub async fn pending_patches(&self) -> usize {
        self.patches.lock().await.len()
    }

    async fn handle_event(&self, event: TreeEvent) {
        match event {
            TreeEvent::Loading => {}
            TreeEvent::Tree(tree) => self.ingest(&tree).await,
            TreeEvent::Failed(message) => {
                tracing::error!(error = %message, "Remote tree feed failed");
                self.record_failure(message);
            }
        }
    }

    async fn ingest(&self, raw: &Value) {
        let mut tree = sanitized(raw, &self.layout.reserved_key);
        let error = raw
            .is_null()
            .then(|| "No data available from the remote store.".to_string());

        let mut patches = self.patches.lock().await;
        let confirmed = patches.reconcile(&tree);
        patches.apply_all(&mut tree);
        let pending = patches.len();

        let snapshot = Snapshot::from_sanitized(tree, self.layout.clone());
        self.state.send_replace(DataState {
            snapshot,
            loading: false,
            error,
        });
        drop(patches);

        tracing::debug!(confirmed, pending, "Ingested tree snapshot");
    }

    fn record_failure(&self, message: String) {
        self.state.send_modify(|state| {
            state.loading = false;
            state.error = Some(message);
        });
    }

    /// Remember a confirmed write and show it in the local view immediately.
    async fn apply_local(&self, path: StorePath, op: PatchOp) {
        let mut patches = self.patches.lock().await;
        let mut tree = self.state.borrow().snapshot.tree().clone();
        op.apply(&path, &mut tree);
        patches.record(path, op);

        self.state.send_modify(|state| {
            state.snapshot = Snapshot::from_sanitized(tree, self.layout.clone());
        });
    }

    /// Writes wait for the first tree.
    fn ensure_ready(&self) -> Result<(), RepositoryError> {
        if self.state.borrow().loading {
            return Err(RepositoryError::NotReady);
        }
        Ok(())
    }

    async fn exists(&self, path: &StorePath) -> Result<bool, RepositoryError> {
        Ok(self
            .store
            .get(path)
            .await?
            .is_some_and(|value| !value.is_null()))
    }

    /// Create empty placeholders for any missing ancestor of `path`, so the
    /// write below never lands on a partial path. Existence is checked against
    /// the store; the local view may lag behind it.
    async fn ensure_path(&self, path: &StorePath) -> Result<(), RepositoryError> {
        for ancestor in path.ancestors() {
            if self.exists(&ancestor).await? {
                continue;
            }
            tracing::debug!(path = %ancestor, "Creating placeholder");
            let placeholder = Value::Object(Map::new());
            self.store.set(&ancestor, placeholder.clone()).await?;
            self.apply_local(ancestor, PatchOp::Set(placeholder)).await;
        }
        Ok(())
    }

    fn document_value(&self, fields: &DocumentFields) -> Result<Value, RepositoryError> {
        fields.validate()?;
        let value = fields.to_value();
        if contains_reserved(&value, &self.layout.reserved_key) {
            return Err(PathError::Reserved(self.layout.reserved_key.clone()).into());
        }
        Ok(value)
    }

    fn subject_path(&self, segments: &[&str]) -> Result<StorePath, RepositoryError> {
        let mut path = StorePath::root().child(&self.layout.subject_catalog_key)?;
        for segment in segments {
            if *segment == self.layout.reserved_key {
                return Err(PathError::Reserved(segment.to_string()).into());
            }
            path = path.child(segment.trim())?;
        }
        Ok(path)
    }

    #[instrument(skip(self, fields), fields(department = %location.department))]
    pub async fn add_document(
        &self,
        location: &DocumentLocation,
        fields: DocumentFields,
    ) -> Result<Document, RepositoryError> {
        self.ensure_ready()?;
        if !fields.has_name() {
            return Err(RepositoryError::Invalid(
                "documentName is required".to_string(),
            ));
        }
        let value = self.document_value(&fields)?;

        let collection = location.collection_path(&self.layout)?;
        self.ensure_path(&collection).await?;

        let id = self
            .store
            .push(&collection, value.clone())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to add document");
                e
            })?;

        self.apply_local(collection.child(&id)?, PatchOp::Set(value))
            .await;
        tracing::info!(doc_id = %id, path = %collection, "Document added");

        Ok(Document {
            id,
            department: location.department.clone(),
            sub_department: location
                .sub_department
                .clone()
                .filter(|_| location.department == self.layout.special_department),
            fields,
        })
    }

    #[instrument(skip(self, fields), fields(department = %location.department, doc_id = %id))]
    pub async fn update_document(
        &self,
        location: &DocumentLocation,
        id: &str,
        fields: DocumentFields,
    ) -> Result<Document, RepositoryError> {
        self.ensure_ready()?;
        let value = self.document_value(&fields)?;
        let path = location.document_path(&self.layout, id)?;
        if !self.exists(&path).await? {
            return Err(RepositoryError::DocumentNotFound(path.to_string()));
        }

        let children = match value {
            Value::Object(children) => children,
            _ => Map::new(),
        };
        self.store
            .update(&path, children.clone())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to update document");
                e
            })?;

        self.apply_local(path.clone(), PatchOp::Merge(children)).await;
        tracing::info!(path = %path, "Document updated");

        self.snapshot()
            .document(location, id)
            .ok_or_else(|| RepositoryError::DocumentNotFound(path.to_string()))
    }

    /// Deleting a key that does not exist succeeds and changes nothing else.
    #[instrument(skip(self), fields(department = %location.department, doc_id = %id))]
    pub async fn delete_document(
        &self,
        location: &DocumentLocation,
        id: &str,
    ) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        let path = location.document_path(&self.layout, id)?;
        self.store.remove(&path).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to delete document");
            e
        })?;

        self.apply_local(path.clone(), PatchOp::Remove).await;
        tracing::info!(path = %path, "Document deleted");
        Ok(())
    }

    /// Add a subject name under `department/category`. Without an explicit key
    /// the next `SUB-n` key is used.
    #[instrument(skip(self))]
    pub async fn add_subject(
        &self,
        department: &str,
        category: &str,
        key: Option<&str>,
        name: &str,
    ) -> Result<Subject, RepositoryError> {
        self.ensure_ready()?;
        let name = name.trim();
        if name.is_empty() {
            return Err(RepositoryError::Invalid("subject name is required".to_string()));
        }
        let key = match key.map(str::trim).filter(|k| !k.is_empty()) {
            Some(key) => key.to_string(),
            None => {
                let category_path = self.subject_path(&[department, category])?;
                let current = self.store.get(&category_path).await?;
                next_key_among(current.as_ref().and_then(Value::as_object))
            }
        };

        let path = self.subject_path(&[department, category, &key])?;
        self.ensure_path(&path).await?;

        let value = Value::String(name.to_string());
        self.store.set(&path, value.clone()).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to add subject");
            e
        })?;

        self.apply_local(path.clone(), PatchOp::Set(value)).await;
        tracing::info!(path = %path, "Subject added");
        Ok(Subject::new(key, name))
    }

    #[instrument(skip(self))]
    pub async fn delete_subject(
        &self,
        department: &str,
        category: &str,
        key: &str,
    ) -> Result<(), RepositoryError> {
        let path = self.subject_path(&[department, category, key])?;
        self.remove_path(path, "Subject deleted").await
    }

    #[instrument(skip(self))]
    pub async fn add_subject_category(
        &self,
        department: &str,
        category: &str,
    ) -> Result<(), RepositoryError> {
        let path = self.subject_path(&[department, category])?;
        self.add_placeholder(path, "Subject category added").await
    }

    #[instrument(skip(self))]
    pub async fn delete_subject_category(
        &self,
        department: &str,
        category: &str,
    ) -> Result<(), RepositoryError> {
        let path = self.subject_path(&[department, category])?;
        self.remove_path(path, "Subject category deleted").await
    }

    #[instrument(skip(self))]
    pub async fn add_subject_department(&self, department: &str) -> Result<(), RepositoryError> {
        let path = self.subject_path(&[department])?;
        self.add_placeholder(path, "Subject department added").await
    }

    #[instrument(skip(self))]
    pub async fn delete_subject_department(
        &self,
        department: &str,
    ) -> Result<(), RepositoryError> {
        let path = self.subject_path(&[department])?;
        self.remove_path(path, "Subject department deleted").await
    }

    /// Create an empty node at `path`. An existing node is left as it is.
    async fn add_placeholder(
        &self,
        path: StorePath,
        message: &'static str,
    ) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        self.ensure_path(&path).await?;
        if self.exists(&path).await? {
            tracing::debug!(path = %path, "Node already exists");
            return Ok(());
        }

        let placeholder = Value::Object(Map::new());
        self.store
            .set(&path, placeholder.clone())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, path = %path, "Failed to create node");
                e
            })?;

        self.apply_local(path.clone(), PatchOp::Set(placeholder))
            .await;
        tracing::info!(path = %path, "{}", message);
        Ok(())
    }

    async fn remove_path(&self, path: StorePath, message: &'static str) -> Result<(), RepositoryError> {
        self.ensure_ready()?;
        self.store.remove(&path).await.map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to delete node");
            e
        })?;

        self.apply_local(path.clone(), PatchOp::Remove).await;
        tracing::info!(path = %path, "{}", message);
        Ok(())
    }
}

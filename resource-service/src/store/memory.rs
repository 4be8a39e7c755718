use super::push_id::PushIdGenerator;
use super::{RemoteStore, StoreError, StorePath, TreeEvent};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};

/// In-process tree with the same contract as the hosted database. Every
/// mutation publishes the full tree to subscribers.
pub struct MemoryStore {
    tree: RwLock<Value>,
    events: watch::Sender<TreeEvent>,
    push_ids: Mutex<PushIdGenerator>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new(initial: Value) -> Self {
        let (events, _) = watch::channel(TreeEvent::Tree(Arc::new(initial.clone())));
        Self {
            tree: RwLock::new(initial),
            events,
            push_ids: Mutex::new(PushIdGenerator::new()),
            offline: AtomicBool::new(false),
        }
    }

    pub fn empty() -> Self {
        Self::new(Value::Object(Map::new()))
    }

    pub async fn from_file(path: &std::path::Path) -> Result<Self, StoreError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|e| StoreError::Connectivity(format!("{}: {}", path.display(), e)))?;
        let tree: Value =
            serde_json::from_slice(&raw).map_err(|e| StoreError::Decode(e.to_string()))?;
        tracing::info!(path = %path.display(), "Seeded in-memory store");
        Ok(Self::new(tree))
    }

    /// Simulate a lost connection: reads and writes fail until restored.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
        if offline {
            self.events
                .send_replace(TreeEvent::Failed("store offline".to_string()));
        }
    }

    /// Current raw tree, including reserved members.
    pub async fn tree(&self) -> Value {
        self.tree.read().await.clone()
    }

    fn ensure_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Connectivity("store offline".to_string()));
        }
        Ok(())
    }

    async fn mutate(&self, apply: impl FnOnce(&mut Value)) -> Result<(), StoreError> {
        self.ensure_online()?;
        let mut tree = self.tree.write().await;
        apply(&mut tree);
        self.events
            .send_replace(TreeEvent::Tree(Arc::new(tree.clone())));
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.ensure_online()?;
        let tree = self.tree.read().await;
        Ok(path.lookup(&tree).cloned())
    }

    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError> {
        self.mutate(|tree| path.write(tree, value)).await
    }

    async fn update(
        &self,
        path: &StorePath,
        children: Map<String, Value>,
    ) -> Result<(), StoreError> {
        for key in children.keys() {
            path.child(key)?;
        }
        self.mutate(|tree| path.merge(tree, &children)).await
    }

    async fn remove(&self, path: &StorePath) -> Result<(), StoreError> {
        self.mutate(|tree| path.delete(tree)).await
    }

    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError> {
        self.ensure_online()?;
        let key = self.push_ids.lock().await.next_id();
        let target = path.child(&key)?;
        self.mutate(|tree| target.write(tree, value)).await?;
        Ok(key)
    }

    fn subscribe(&self) -> watch::Receiver<TreeEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryStore::empty();
        let path = StorePath::parse("CSE/doc1").unwrap();

        store
            .set(&path, json!({ "documentName": "Notes" }))
            .await
            .unwrap();
        assert_eq!(
            store.get(&path).await.unwrap(),
            Some(json!({ "documentName": "Notes" }))
        );

        store.remove(&path).await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), None);
        // Second delete of the same key is fine.
        store.remove(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_object_placeholder_is_kept() {
        let store = MemoryStore::empty();
        let path = StorePath::parse("Subjects/CSE").unwrap();
        store.set(&path, json!({})).await.unwrap();
        assert_eq!(store.get(&path).await.unwrap(), Some(json!({})));
    }

    #[tokio::test]
    async fn test_push_assigns_ordered_keys() {
        let store = MemoryStore::empty();
        let path = StorePath::parse("CSE").unwrap();
        let first = store.push(&path, json!({ "n": 1 })).await.unwrap();
        let second = store.push(&path, json!({ "n": 2 })).await.unwrap();
        assert!(first < second);

        let tree = store.get_tree().await.unwrap();
        assert_eq!(tree["CSE"][&first]["n"], 1);
        assert_eq!(tree["CSE"][&second]["n"], 2);
    }

    #[tokio::test]
    async fn test_update_rejects_invalid_child_keys() {
        let store = MemoryStore::empty();
        let children = json!({ "bad.key": 1 }).as_object().cloned().unwrap();
        let result = store.update(&StorePath::root(), children).await;
        assert!(matches!(result, Err(StoreError::Path(_))));
    }

    #[tokio::test]
    async fn test_subscribers_see_every_write() {
        let store = MemoryStore::empty();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store
            .set(&StorePath::parse("ECE").unwrap(), json!({ "d": { "documentName": "x" } }))
            .await
            .unwrap();

        rx.changed().await.unwrap();
        match &*rx.borrow() {
            TreeEvent::Tree(tree) => assert_eq!(tree["ECE"]["d"]["documentName"], "x"),
            other => panic!("unexpected event {:?}", other),
        };
    }

    #[tokio::test]
    async fn test_offline_fails_requests() {
        let store = MemoryStore::empty();
        store.set_offline(true);
        assert!(matches!(
            store.get_tree().await,
            Err(StoreError::Connectivity(_))
        ));
        assert!(matches!(
            store.remove(&StorePath::parse("CSE").unwrap()).await,
            Err(StoreError::Connectivity(_))
        ));

        store.set_offline(false);
        assert!(store.get_tree().await.is_ok());
    }
}

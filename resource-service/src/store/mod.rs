//! Remote store capability.
//!
//! The hosted realtime database is an external collaborator: a hierarchical
//! key-value tree that pushes the whole tree to subscribers on every change.

pub mod memory;
pub mod path;
pub mod push_id;
pub mod rest;

pub use memory::MemoryStore;
pub use path::{PathError, StorePath};
pub use rest::RestStore;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Remote store unreachable: {0}")]
    Connectivity(String),

    #[error("Remote store returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response from remote store: {0}")]
    Decode(String),

    #[error(transparent)]
    Path(#[from] PathError),
}

/// Latest state of the tree feed.
#[derive(Debug, Clone)]
pub enum TreeEvent {
    /// Nothing received yet.
    Loading,
    Tree(Arc<Value>),
    Failed(String),
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Value at `path`, `None` when absent.
    async fn get(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Replace the value at `path`. Writing `null` deletes it.
    async fn set(&self, path: &StorePath, value: Value) -> Result<(), StoreError>;

    /// Shallow-merge `children` into the object at `path`. A `null` child is removed.
    async fn update(&self, path: &StorePath, children: Map<String, Value>)
        -> Result<(), StoreError>;

    /// Delete `path`. Deleting an absent path succeeds.
    async fn remove(&self, path: &StorePath) -> Result<(), StoreError>;

    /// Store `value` under a new chronologically ordered key below `path`.
    async fn push(&self, path: &StorePath, value: Value) -> Result<String, StoreError>;

    /// Whole-tree feed; the receiver always holds the latest event.
    fn subscribe(&self) -> watch::Receiver<TreeEvent>;

    async fn get_tree(&self) -> Result<Value, StoreError> {
        Ok(self.get(&StorePath::root()).await?.unwrap_or(Value::Null))
    }
}

//! Optimistic local patches awaiting confirmation from the remote feed.
//!
//! After a write succeeds, the change is applied to the local view right away
//! and remembered here. Each inbound tree is then checked against the queue:
//! patches the tree already reflects are dropped, the rest are re-applied on
//! top of it, and patches that outlive `max_age` inbound trees are discarded
//! so the server value wins.

use crate::store::StorePath;
use serde_json::{Map, Value};
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub enum PatchOp {
    Set(Value),
    Merge(Map<String, Value>),
    Remove,
}

impl PatchOp {
    pub fn apply(&self, path: &StorePath, tree: &mut Value) {
        match self {
            PatchOp::Set(value) => path.write(tree, value.clone()),
            PatchOp::Merge(children) => path.merge(tree, children),
            PatchOp::Remove => path.delete(tree),
        }
    }

    /// Whether `tree` already shows the effect of this patch at `path`.
    pub fn is_reflected(&self, path: &StorePath, tree: &Value) -> bool {
        let current = path.lookup(tree);
        match self {
            PatchOp::Set(Value::Object(map)) if map.is_empty() => current.is_some(),
            PatchOp::Set(value) => current == Some(value),
            PatchOp::Merge(children) => children.iter().all(|(key, value)| {
                let child = current.and_then(|node| node.get(key)).filter(|v| !v.is_null());
                if value.is_null() {
                    child.is_none()
                } else {
                    child == Some(value)
                }
            }),
            PatchOp::Remove => current.is_none(),
        }
    }
}

#[derive(Debug, Clone)]
struct PendingPatch {
    path: StorePath,
    op: PatchOp,
    age: u32,
}

#[derive(Debug)]
pub struct PatchQueue {
    pending: VecDeque<PendingPatch>,
    max_age: u32,
}

impl PatchQueue {
    pub fn new(max_age: u32) -> Self {
        Self {
            pending: VecDeque::new(),
            max_age,
        }
    }

    pub fn record(&mut self, path: StorePath, op: PatchOp) {
        self.pending.push_back(PendingPatch { path, op, age: 0 });
    }

    /// Re-apply every pending patch, oldest first.
    pub fn apply_all(&self, tree: &mut Value) {
        for patch in &self.pending {
            patch.op.apply(&patch.path, tree);
        }
    }

    /// Age the queue against a fresh inbound tree. Returns the number of
    /// patches dropped because the tree confirmed them.
    pub fn reconcile(&mut self, inbound: &Value) -> usize {
        let before = self.pending.len();
        let max_age = self.max_age;
        let mut confirmed = 0;
        self.pending.retain_mut(|patch| {
            if patch.op.is_reflected(&patch.path, inbound) {
                confirmed += 1;
                return false;
            }
            patch.age += 1;
            patch.age <= max_age
        });
        let expired = before - confirmed - self.pending.len();
        if expired > 0 {
            tracing::warn!(
                expired,
                "Discarded optimistic patches the remote tree never confirmed"
            );
        }
        confirmed
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("Path segment must not be empty")]
    EmptySegment,

    #[error("Invalid character in path segment '{0}'")]
    InvalidSegment(String),

    #[error("'{0}' is reserved and cannot be addressed")]
    Reserved(String),

    #[error("Incomplete path: {0}")]
    MissingSegment(String),
}

/// A validated slash-separated location in the tree. The empty path is the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct StorePath(Vec<String>);

impl StorePath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn parse(raw: &str) -> Result<Self, PathError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }
        trimmed
            .split('/')
            .try_fold(Self::root(), |path, segment| path.child(segment))
    }

    pub fn from_segments<I, S>(segments: I) -> Result<Self, PathError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments
            .into_iter()
            .try_fold(Self::root(), |path, segment| path.child(segment.as_ref()))
    }

    pub fn child(&self, segment: &str) -> Result<Self, PathError> {
        validate_segment(segment)?;
        let mut segments = self.0.clone();
        segments.push(segment.to_string());
        Ok(Self(segments))
    }

    pub fn parent(&self) -> Option<Self> {
        let (_, head) = self.0.split_last()?;
        Some(Self(head.to_vec()))
    }

    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    pub fn first(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.is_root()
    }

    /// Every proper prefix from depth one up to the parent, shallowest first.
    pub fn ancestors(&self) -> impl Iterator<Item = StorePath> + '_ {
        (1..self.0.len()).map(|depth| Self(self.0[..depth].to_vec()))
    }

    pub fn starts_with(&self, prefix: &StorePath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Value at this path inside `tree`.
    pub fn lookup<'a>(&self, tree: &'a Value) -> Option<&'a Value> {
        let mut node = tree;
        for segment in &self.0 {
            node = node.as_object()?.get(segment)?;
        }
        if node.is_null() {
            None
        } else {
            Some(node)
        }
    }

    /// Replace the value at this path, creating intermediate objects (and
    /// replacing non-object intermediates) as needed. `null` deletes.
    pub fn write(&self, tree: &mut Value, value: Value) {
        if value.is_null() {
            self.delete(tree);
            return;
        }
        let Some((last, head)) = self.0.split_last() else {
            *tree = value;
            return;
        };
        let mut node = tree;
        for segment in head {
            node = ensure_object(node)
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }
        ensure_object(node).insert(last.clone(), value);
    }

    /// Shallow-merge `children` into the object at this path.
    pub fn merge(&self, tree: &mut Value, children: &Map<String, Value>) {
        for (key, value) in children {
            // Keys are written as-is; callers validate them beforehand.
            let mut segments = self.0.clone();
            segments.push(key.clone());
            StorePath(segments).write(tree, value.clone());
        }
    }

    /// Remove this path from `tree`. Absent paths are left alone.
    pub fn delete(&self, tree: &mut Value) {
        let Some((last, head)) = self.0.split_last() else {
            *tree = Value::Null;
            return;
        };
        let mut node = tree;
        for segment in head {
            match node.as_object_mut().and_then(|map| map.get_mut(segment)) {
                Some(next) => node = next,
                None => return,
            }
        }
        if let Some(map) = node.as_object_mut() {
            map.remove(last);
        }
    }
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced with an object"),
    }
}

fn validate_segment(segment: &str) -> Result<(), PathError> {
    if segment.is_empty() {
        return Err(PathError::EmptySegment);
    }
    if segment.contains(FORBIDDEN) || segment.contains('/') || segment.chars().any(char::is_control)
    {
        return Err(PathError::InvalidSegment(segment.to_string()));
    }
    Ok(())
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("/"))
    }
}

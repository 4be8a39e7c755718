use serde::{Deserialize, Serialize};

/// One entry of the subject catalog: `Subjects/<dept>/<category>/<key> = name`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subject {
    pub key: String,
    pub name: String,
}

impl Subject {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }
}

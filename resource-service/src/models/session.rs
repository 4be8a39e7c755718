use serde::{Deserialize, Serialize};

pub const ADMIN_DISPLAY_NAME: &str = "Administrator";

/// Locally persisted login state. There are no per-user accounts; a session
/// only records whether the shared admin password was presented.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub display_name: String,
    pub is_admin: bool,
}

impl Session {
    pub fn administrator() -> Self {
        Self {
            display_name: ADMIN_DISPLAY_NAME.to_string(),
            is_admin: true,
        }
    }
}

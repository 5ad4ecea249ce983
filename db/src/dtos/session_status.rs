use serde::{Deserialize, Serialize};

/// Interactive sessions only distinguish running from stopped; they are
/// still driven through the same abort contract as the other unit kinds.
#[derive(sqlx::Type, Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[sqlx(type_name = "session_status", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionStatus {
    Running,
    Stopped,
}

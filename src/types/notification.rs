use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    Mention,
    Assignment,
}

impl NotificationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Mention => "MENTION",
            NotificationKind::Assignment => "ASSIGNMENT",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured notification content. Rendering to text happens at the
/// presentation layer; the stored payload carries ids, not markup.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub actor_id: String,
    pub issue_key: String,
    pub extra: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub kind: NotificationKind,
    pub payload: NotificationPayload,
    /// Deep link into the board view.
    pub url: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

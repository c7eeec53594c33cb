use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on an issue. Immutable once created.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Comment {
    pub id: String,
    pub issue_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    /// Store-global insertion counter, used to break timeline ties.
    pub seq: u64,
}

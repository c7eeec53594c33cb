use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of auditable domain events.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityKind {
    IssueCreated,
    StatusChanged,
    AssigneeChanged,
    CommentAdded,
    ProjectCreated,
    MemberInvited,
    MemberJoined,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::IssueCreated => "ISSUE_CREATED",
            ActivityKind::StatusChanged => "STATUS_CHANGED",
            ActivityKind::AssigneeChanged => "ASSIGNEE_CHANGED",
            ActivityKind::CommentAdded => "COMMENT_ADDED",
            ActivityKind::ProjectCreated => "PROJECT_CREATED",
            ActivityKind::MemberInvited => "MEMBER_INVITED",
            ActivityKind::MemberJoined => "MEMBER_JOINED",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One append-only audit record of one state change.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct ActivityEntry {
    pub id: String,
    pub organization_id: String,
    pub issue_id: Option<String>,
    pub kind: ActivityKind,
    pub actor_id: String,
    pub message: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
    /// Store-global insertion counter, used to break timeline ties.
    pub seq: u64,
}

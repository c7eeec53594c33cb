use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::Priority;

/// Classification of issues by their nature and scope.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IssueType {
    /// User-facing unit of value.
    Story,
    /// Standard unit of work.
    #[default]
    Task,
    /// Defect or problem to fix.
    Bug,
    /// Large initiative containing multiple stories or tasks.
    Epic,
}

impl IssueType {
    pub fn as_str(self) -> &'static str {
        match self {
            IssueType::Story => "Story",
            IssueType::Task => "Task",
            IssueType::Bug => "Bug",
            IssueType::Epic => "Epic",
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Issue {
    pub id: String,
    pub project_id: String,
    /// Human-readable key ("ALPHA-7"). Assigned once at creation, unique
    /// within the project, numeric suffix strictly increasing.
    pub key: String,
    pub title: String,
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub priority: Priority,
    pub status_id: String,
    pub assignee_id: Option<String>,
    /// Set to the creator, immutable afterwards.
    pub reporter_id: String,
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A single permitted field edit. The mutation pipeline matches on this
/// exhaustively to derive the right activity entry; one logical field
/// changes per call.
#[derive(Debug, Clone)]
pub enum IssueEdit {
    Title(String),
    Description(Option<String>),
    Type(IssueType),
    Priority(Priority),
    DueDate(Option<NaiveDate>),
    /// `None` unassigns.
    Assignee(Option<String>),
    /// Destination status id; must belong to the issue's project.
    Status(String),
}

impl IssueEdit {
    pub fn field_name(&self) -> &'static str {
        match self {
            IssueEdit::Title(_) => "title",
            IssueEdit::Description(_) => "description",
            IssueEdit::Type(_) => "type",
            IssueEdit::Priority(_) => "priority",
            IssueEdit::DueDate(_) => "due date",
            IssueEdit::Assignee(_) => "assignee",
            IssueEdit::Status(_) => "status",
        }
    }
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Coarse classification of statuses, used only for aggregate counts.
/// Issues always reference a status by id, never by category.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCategory {
    Todo,
    InProgress,
    Done,
}

impl StatusCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusCategory::Todo => "To Do",
            StatusCategory::InProgress => "In Progress",
            StatusCategory::Done => "Done",
        }
    }
}

impl fmt::Display for StatusCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A project-scoped workflow stage. `order` controls board column display.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Status {
    pub id: String,
    pub project_id: String,
    pub name: String,
    pub category: StatusCategory,
    pub order: i32,
}

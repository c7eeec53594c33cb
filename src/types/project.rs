use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Project {
    pub id: String,
    pub organization_id: String,
    pub name: String,
    /// Short uppercase key, unique within the organization. Issue keys are
    /// derived from it ("ALPHA" -> "ALPHA-1").
    pub key: String,
    pub lead_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

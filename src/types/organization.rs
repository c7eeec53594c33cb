use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct Organization {
    pub id: String,
    pub name: String,
    pub slug: String,
    /// The owner's membership can never be role-changed or removed.
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskverseError};
use crate::types::{
    ActivityEntry, Comment, Issue, Membership, Notification, Organization, Project, Status, User,
};

/// The whole tracker state, persisted as one JSON snapshot on disk.
///
/// The engine never mutates this in place across an error path: mutations
/// run on a clone and the clone replaces the original only on success, so a
/// failed mutation leaves no partial writes behind.
#[derive(Serialize, Deserialize, Default, Clone, Debug, PartialEq)]
pub struct Store {
    pub users: Vec<User>,
    pub organizations: Vec<Organization>,
    pub memberships: Vec<Membership>,
    pub projects: Vec<Project>,
    pub statuses: Vec<Status>,
    pub issues: Vec<Issue>,
    pub comments: Vec<Comment>,
    pub activity: Vec<ActivityEntry>,
    pub notifications: Vec<Notification>,
    #[serde(default)]
    next_id: u64,
    #[serde(default)]
    next_seq: u64,
}

impl Store {
    pub fn default_path() -> Result<PathBuf> {
        ProjectDirs::from("", "", "taskverse")
            .map(|dirs| dirs.data_dir().join("store.json"))
            .ok_or(TaskverseError::NoConfigDir)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TaskverseError::NoStore);
        }

        let contents = std::fs::read_to_string(path).map_err(|e| TaskverseError::StoreRead {
            path: path.to_path_buf(),
            source: e,
        })?;

        serde_json::from_str(&contents).map_err(|e| TaskverseError::StoreParse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| TaskverseError::StoreWrite {
                path: path.to_path_buf(),
                source: e,
            })?;
        }

        let contents =
            serde_json::to_string_pretty(self).expect("store serialization cannot fail");

        std::fs::write(path, contents).map_err(|e| TaskverseError::StoreWrite {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Allocate a fresh entity id with a short type prefix ("iss-42").
    pub fn allocate_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    /// Store-global insertion counter. Stamped on comments and activity
    /// entries so timeline ties on `created_at` resolve in insertion order.
    pub fn next_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    // Lookups. Reads return options; the engine turns absence into the
    // matching NotFound error.

    pub fn user(&self, id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn user_by_email(&self, email: &str) -> Option<&User> {
        self.users.iter().find(|u| u.email == email)
    }

    pub fn organization(&self, id: &str) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.id == id)
    }

    pub fn organization_by_slug(&self, slug: &str) -> Option<&Organization> {
        self.organizations.iter().find(|o| o.slug == slug)
    }

    pub fn find_membership(&self, user_id: &str, organization_id: &str) -> Option<&Membership> {
        self.memberships
            .iter()
            .find(|m| m.user_id == user_id && m.organization_id == organization_id)
    }

    pub fn project(&self, id: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_by_key(&self, organization_id: &str, key: &str) -> Option<&Project> {
        self.projects
            .iter()
            .find(|p| p.organization_id == organization_id && p.key == key)
    }

    pub fn status(&self, id: &str) -> Option<&Status> {
        self.statuses.iter().find(|s| s.id == id)
    }

    /// Project statuses in display order.
    pub fn statuses_for_project(&self, project_id: &str) -> Vec<&Status> {
        let mut statuses: Vec<&Status> = self
            .statuses
            .iter()
            .filter(|s| s.project_id == project_id)
            .collect();
        statuses.sort_by_key(|s| s.order);
        statuses
    }

    pub fn issue(&self, id: &str) -> Option<&Issue> {
        self.issues.iter().find(|i| i.id == id)
    }

    pub fn issue_mut(&mut self, id: &str) -> Option<&mut Issue> {
        self.issues.iter_mut().find(|i| i.id == id)
    }

    pub fn issues_for_project(&self, project_id: &str) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.project_id == project_id)
            .collect()
    }

    pub fn comments_for_issue(&self, issue_id: &str) -> Vec<&Comment> {
        let mut comments: Vec<&Comment> = self
            .comments
            .iter()
            .filter(|c| c.issue_id == issue_id)
            .collect();
        comments.sort_by_key(|c| (c.created_at, c.seq));
        comments
    }

    pub fn activity_for_issue(&self, issue_id: &str) -> Vec<&ActivityEntry> {
        let mut entries: Vec<&ActivityEntry> = self
            .activity
            .iter()
            .filter(|a| a.issue_id.as_deref() == Some(issue_id))
            .collect();
        entries.sort_by_key(|a| (a.created_at, a.seq));
        entries
    }

    /// Newest first.
    pub fn notifications_for(&self, recipient_id: &str) -> Vec<&Notification> {
        let mut notifications: Vec<&Notification> = self
            .notifications
            .iter()
            .filter(|n| n.recipient_id == recipient_id)
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        notifications
    }

    pub fn members_of(&self, organization_id: &str) -> Vec<&Membership> {
        self.memberships
            .iter()
            .filter(|m| m.organization_id == organization_id)
            .collect()
    }

    /// Users who are members of the organization.
    pub fn member_users(&self, organization_id: &str) -> Vec<&User> {
        self.members_of(organization_id)
            .into_iter()
            .filter_map(|m| self.user(&m.user_id))
            .collect()
    }
}

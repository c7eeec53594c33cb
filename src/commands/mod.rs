pub mod board;
pub mod init;
pub mod issues;
pub mod members;
pub mod notifications;
pub mod projects;

use std::path::PathBuf;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{Result, TaskverseError};
use crate::session::CallerContext;
use crate::store::Store;
use crate::types::{Organization, Project, Status};

/// Loaded store, authenticated caller, and where to persist changes.
/// Every command except `init` and `completions` starts by opening one.
pub struct Workspace {
    pub engine: Engine,
    pub caller: CallerContext,
    store_path: PathBuf,
}

impl Workspace {
    pub fn open(config: &Config, as_user: Option<&str>) -> Result<Self> {
        let store_path = config.store_path()?;
        let store = Store::load(&store_path)?;
        let user = as_user.map(String::from).or_else(|| config.user());
        let caller = CallerContext::resolve(&store, user.as_deref())?;

        Ok(Workspace {
            engine: Engine::new(store),
            caller,
            store_path,
        })
    }

    pub fn store(&self) -> &Store {
        self.engine.store()
    }

    /// Persist the store after a successful mutation.
    pub fn save(&self) -> Result<()> {
        self.engine.store().save(&self.store_path)
    }

    /// Resolve the organization to operate on: explicit flag, configured
    /// default, or the caller's only organization.
    pub fn resolve_org(&self, config: &Config, explicit: Option<&str>) -> Result<Organization> {
        if let Some(slug) = config.resolve_org(explicit) {
            return self
                .store()
                .organization_by_slug(&slug)
                .cloned()
                .ok_or(TaskverseError::OrganizationNotFound(slug));
        }

        let mut orgs = self.store().organizations.iter().filter(|o| {
            self.store()
                .find_membership(&self.caller.user_id, &o.id)
                .is_some()
        });
        match (orgs.next(), orgs.next()) {
            (Some(org), None) => Ok(org.clone()),
            (Some(_), Some(_)) => Err(TaskverseError::Validation(
                "you belong to multiple organizations; pass --org or set default_org".into(),
            )),
            (None, _) => Err(TaskverseError::NotAuthorized),
        }
    }

    /// Resolve the project to operate on, searching the caller's
    /// organizations by key.
    pub fn resolve_project(&self, config: &Config, explicit: Option<&str>) -> Result<Project> {
        let member_projects = || {
            self.store().projects.iter().filter(|p| {
                self.store()
                    .find_membership(&self.caller.user_id, &p.organization_id)
                    .is_some()
            })
        };

        if let Some(key) = config.resolve_project(explicit) {
            return member_projects()
                .find(|p| p.key.eq_ignore_ascii_case(&key))
                .cloned()
                .ok_or(TaskverseError::ProjectNotFound(key));
        }

        let mut projects = member_projects();
        match (projects.next(), projects.next()) {
            (Some(project), None) => Ok(project.clone()),
            (Some(_), Some(_)) => Err(TaskverseError::Validation(
                "multiple projects available; pass --project or set default_project".into(),
            )),
            (None, _) => Err(TaskverseError::ProjectNotFound(
                "no projects yet. Run 'taskverse project create'".into(),
            )),
        }
    }

    /// Look up an issue by key, restricted to projects the caller is a
    /// member of. Keys are unique per project, not store-wide: two
    /// organizations can each own an "ALPHA-1", so the search must scope to
    /// the caller's projects before matching the key.
    pub fn resolve_issue(&self, key: &str) -> Result<crate::types::Issue> {
        self.store()
            .issues
            .iter()
            .filter(|i| {
                self.store().project(&i.project_id).is_some_and(|p| {
                    self.store()
                        .find_membership(&self.caller.user_id, &p.organization_id)
                        .is_some()
                })
            })
            .find(|i| i.key == key)
            .cloned()
            .ok_or_else(|| TaskverseError::IssueNotFound(key.to_string()))
    }

    /// Map an assignee argument to a user id: "me", "none", or an email.
    pub fn resolve_assignee(&self, arg: &str) -> Result<Option<String>> {
        match arg {
            "none" => Ok(None),
            "me" => Ok(Some(self.caller.user_id.clone())),
            email => self
                .store()
                .user_by_email(email)
                .map(|u| Some(u.id.clone()))
                .ok_or_else(|| TaskverseError::UserNotFound(email.to_string())),
        }
    }

    /// Display name for an actor id, falling back to the raw id for
    /// records whose user has since been deleted.
    pub fn actor_name(&self, user_id: &str) -> String {
        self.store()
            .user(user_id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| user_id.to_string())
    }
}

/// Find a project status by name, case-insensitive substring match.
pub fn status_by_name<'a>(store: &'a Store, project_id: &str, name: &str) -> Result<&'a Status> {
    let lower = name.to_lowercase();
    store
        .statuses_for_project(project_id)
        .into_iter()
        .find(|s| s.name.to_lowercase().contains(&lower))
        .ok_or_else(|| TaskverseError::StatusNotFound(name.to_string()))
}

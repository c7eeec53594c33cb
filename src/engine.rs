//! The mutation pipeline: every state change to the tracker goes through
//! here. Each operation loads, authorizes, mutates, and emits its activity
//! and notifications inside one store transaction, so a rejected mutation
//! leaves nothing behind.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use serde_json::json;

use crate::activity::{issue_url, notify, record_activity};
use crate::auth;
use crate::error::{Result, TaskverseError};
use crate::keys;
use crate::mentions;
use crate::session::CallerContext;
use crate::store::Store;
use crate::types::{
    ActivityEntry, ActivityKind, Comment, Issue, IssueEdit, IssueType, Membership, Notification,
    NotificationKind, NotificationPayload, Organization, Priority, Project, Role, Status,
    StatusCategory, User,
};

/// Input for issue creation. The reporter is always the caller and is not
/// part of this struct.
#[derive(Debug, Clone, Default)]
pub struct CreateIssue {
    pub project_id: String,
    pub title: String,
    pub description: Option<String>,
    pub issue_type: IssueType,
    pub priority: Priority,
    /// Defaults to the project's first status.
    pub status_id: Option<String>,
    pub assignee_id: Option<String>,
    pub due_date: Option<NaiveDate>,
}

/// A successful issue mutation, carrying the records created alongside it
/// so open client views can merge them without refetching.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct IssueChange {
    pub issue: Issue,
    pub activity: Vec<ActivityEntry>,
    pub notifications: Vec<Notification>,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct CommentChange {
    pub comment: Comment,
    pub issue: Issue,
    pub activity: Vec<ActivityEntry>,
    pub notifications: Vec<Notification>,
}

pub struct Engine {
    store: Store,
}

impl Engine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn into_store(self) -> Store {
        self.store
    }

    /// Run a mutation against a working copy of the store; commit the copy
    /// only if the mutation succeeds. This is the single-transaction
    /// guarantee: state writes, activity entries and notifications land
    /// together or not at all.
    fn transact<T>(&mut self, f: impl FnOnce(&mut Store) -> Result<T>) -> Result<T> {
        let mut work = self.store.clone();
        let out = f(&mut work)?;
        self.store = work;
        Ok(out)
    }

    pub async fn create_issue(
        &mut self,
        caller: &CallerContext,
        req: CreateIssue,
    ) -> Result<IssueChange> {
        self.transact(|store| {
            if req.title.trim().is_empty() {
                return Err(TaskverseError::Validation("issue title cannot be empty".into()));
            }

            let project = store
                .project(&req.project_id)
                .cloned()
                .ok_or_else(|| TaskverseError::ProjectNotFound(req.project_id.clone()))?;
            let organization = store
                .organization(&project.organization_id)
                .cloned()
                .ok_or_else(|| {
                    TaskverseError::OrganizationNotFound(project.organization_id.clone())
                })?;

            auth::authorize(store, caller, &organization.id)?;

            let status_id = match &req.status_id {
                Some(id) => {
                    let status = store
                        .status(id)
                        .filter(|s| s.project_id == project.id)
                        .ok_or_else(|| TaskverseError::StatusNotFound(id.clone()))?;
                    status.id.clone()
                }
                None => store
                    .statuses_for_project(&project.id)
                    .first()
                    .map(|s| s.id.clone())
                    .ok_or_else(|| {
                        TaskverseError::StatusNotFound(format!(
                            "project {} has no statuses",
                            project.key
                        ))
                    })?,
            };

            if let Some(assignee_id) = &req.assignee_id {
                store
                    .find_membership(assignee_id, &organization.id)
                    .ok_or_else(|| TaskverseError::MemberNotFound(assignee_id.clone()))?;
            }

            // Key allocation and insert share this transaction, so the
            // computed maximum cannot go stale before the insert commits.
            let key = keys::next_key(
                &project.key,
                store
                    .issues_for_project(&project.id)
                    .into_iter()
                    .map(|i| i.key.as_str()),
            );

            let now = Utc::now();
            let issue = Issue {
                id: store.allocate_id("iss"),
                project_id: project.id.clone(),
                key: key.clone(),
                title: req.title.trim().to_string(),
                description: req.description.clone(),
                issue_type: req.issue_type,
                priority: req.priority,
                status_id,
                assignee_id: req.assignee_id.clone(),
                reporter_id: caller.user_id.clone(),
                due_date: req.due_date,
                created_at: now,
                updated_at: now,
            };
            store.issues.push(issue.clone());

            let entry = record_activity(
                store,
                &organization.id,
                Some(&issue.id),
                &caller.user_id,
                ActivityKind::IssueCreated,
                format!("created {}", key),
                None,
            );

            let mut notifications = Vec::new();
            if let Some(assignee_id) = &issue.assignee_id {
                if let Some(n) = notify(
                    store,
                    assignee_id,
                    NotificationKind::Assignment,
                    NotificationPayload {
                        actor_id: caller.user_id.clone(),
                        issue_key: key.clone(),
                        extra: None,
                    },
                    issue_url(&organization.slug, &project.key, &key),
                ) {
                    notifications.push(n);
                }
            }

            Ok(IssueChange {
                issue,
                activity: vec![entry],
                notifications,
            })
        })
    }

    /// Apply one field edit to an issue. Exactly one logical field changes
    /// per call; callers with several changes submit them sequentially.
    pub async fn update_issue(
        &mut self,
        caller: &CallerContext,
        issue_id: &str,
        edit: IssueEdit,
    ) -> Result<IssueChange> {
        self.transact(|store| {
            let (issue, project, organization) = load_issue_context(store, issue_id)?;
            auth::authorize(store, caller, &organization.id)?;

            let mut activity = Vec::new();
            let mut notifications = Vec::new();

            match edit {
                IssueEdit::Status(dest_id) => {
                    // The "from" status is read here, inside the same
                    // transaction that writes the "to" status, so the
                    // recorded transition is accurate at commit time.
                    let from = store
                        .status(&issue.status_id)
                        .cloned()
                        .ok_or_else(|| TaskverseError::StatusNotFound(issue.status_id.clone()))?;
                    let dest = store
                        .status(&dest_id)
                        .filter(|s| s.project_id == project.id)
                        .cloned()
                        .ok_or_else(|| TaskverseError::StatusNotFound(dest_id.clone()))?;

                    if dest.id != from.id {
                        edit_issue(store, issue_id, |i| {
                            i.status_id = dest.id.clone();
                        })?;
                        activity.push(record_activity(
                            store,
                            &organization.id,
                            Some(issue_id),
                            &caller.user_id,
                            ActivityKind::StatusChanged,
                            format!("moved {} from {} to {}", issue.key, from.name, dest.name),
                            Some(json!({ "from": from.id, "to": dest.id })),
                        ));
                    }
                }
                IssueEdit::Assignee(new_assignee) => {
                    let (entries, notices) =
                        apply_assignee(store, caller, issue_id, new_assignee)?;
                    activity.extend(entries);
                    notifications.extend(notices);
                }
                IssueEdit::Title(title) => {
                    if title.trim().is_empty() {
                        return Err(TaskverseError::Validation(
                            "issue title cannot be empty".into(),
                        ));
                    }
                    edit_issue(store, issue_id, |i| {
                        i.title = title.trim().to_string();
                    })?;
                }
                IssueEdit::Description(description) => {
                    edit_issue(store, issue_id, |i| {
                        i.description = description;
                    })?;
                }
                IssueEdit::Type(issue_type) => {
                    edit_issue(store, issue_id, |i| {
                        i.issue_type = issue_type;
                    })?;
                }
                IssueEdit::Priority(priority) => {
                    edit_issue(store, issue_id, |i| {
                        i.priority = priority;
                    })?;
                }
                IssueEdit::DueDate(due_date) => {
                    edit_issue(store, issue_id, |i| {
                        i.due_date = due_date;
                    })?;
                }
            }

            let updated = store
                .issue(issue_id)
                .cloned()
                .ok_or_else(|| TaskverseError::IssueNotFound(issue_id.to_string()))?;

            Ok(IssueChange {
                issue: updated,
                activity,
                notifications,
            })
        })
    }

    /// Add a comment. Side effects: one COMMENT_ADDED entry, a MENTION
    /// notification per resolved mention, and — when exactly one user
    /// resolves and is not already the assignee — auto-assignment through
    /// the same path as an explicit assignee edit.
    pub async fn create_comment(
        &mut self,
        caller: &CallerContext,
        issue_id: &str,
        body: &str,
    ) -> Result<CommentChange> {
        self.transact(|store| {
            if body.trim().is_empty() {
                return Err(TaskverseError::Validation(
                    "comment body cannot be empty".into(),
                ));
            }

            let (issue, project, organization) = load_issue_context(store, issue_id)?;
            auth::authorize(store, caller, &organization.id)?;

            let comment = Comment {
                id: store.allocate_id("cmt"),
                issue_id: issue_id.to_string(),
                author_id: caller.user_id.clone(),
                body: body.to_string(),
                created_at: Utc::now(),
                seq: store.next_seq(),
            };
            store.comments.push(comment.clone());

            let mut activity = vec![record_activity(
                store,
                &organization.id,
                Some(issue_id),
                &caller.user_id,
                ActivityKind::CommentAdded,
                format!("commented on {}", issue.key),
                None,
            )];
            let mut notifications = Vec::new();

            let members: Vec<User> = store
                .member_users(&organization.id)
                .into_iter()
                .cloned()
                .collect();
            let mentioned: Vec<User> = mentions::resolve_mentions(body, &members)
                .into_iter()
                .cloned()
                .collect();

            let url = issue_url(&organization.slug, &project.key, &issue.key);
            for user in &mentioned {
                if let Some(n) = notify(
                    store,
                    &user.id,
                    NotificationKind::Mention,
                    NotificationPayload {
                        actor_id: caller.user_id.clone(),
                        issue_key: issue.key.clone(),
                        extra: None,
                    },
                    url.clone(),
                ) {
                    notifications.push(n);
                }
            }

            // An unambiguous mention assigns the issue; zero or several
            // mentions are informational only.
            if mentioned.len() == 1 && issue.assignee_id.as_deref() != Some(mentioned[0].id.as_str())
            {
                let (entries, notices) =
                    apply_assignee(store, caller, issue_id, Some(mentioned[0].id.clone()))?;
                activity.extend(entries);
                notifications.extend(notices);
            }

            let updated = store
                .issue(issue_id)
                .cloned()
                .ok_or_else(|| TaskverseError::IssueNotFound(issue_id.to_string()))?;

            Ok(CommentChange {
                comment,
                issue: updated,
                activity,
                notifications,
            })
        })
    }

    pub async fn register_user(&mut self, name: &str, email: &str) -> Result<User> {
        self.transact(|store| {
            if name.trim().is_empty() || !email.contains('@') {
                return Err(TaskverseError::Validation(
                    "a name and a valid email are required".into(),
                ));
            }
            if store.user_by_email(email).is_some() {
                return Err(TaskverseError::Conflict(format!(
                    "a user with email {} already exists",
                    email
                )));
            }

            let user = User {
                id: store.allocate_id("usr"),
                name: name.trim().to_string(),
                email: email.to_string(),
            };
            store.users.push(user.clone());
            Ok(user)
        })
    }

    /// The creator becomes the organization owner; their bootstrap
    /// membership is the one MEMBER_JOINED entry.
    pub async fn create_organization(
        &mut self,
        caller: &CallerContext,
        name: &str,
        slug: &str,
    ) -> Result<Organization> {
        self.transact(|store| {
            if !is_valid_slug(slug) {
                return Err(TaskverseError::Validation(format!(
                    "invalid organization slug: {}",
                    slug
                )));
            }
            if store.organization_by_slug(slug).is_some() {
                return Err(TaskverseError::Conflict(format!(
                    "an organization with slug {} already exists",
                    slug
                )));
            }

            let organization = Organization {
                id: store.allocate_id("org"),
                name: name.trim().to_string(),
                slug: slug.to_string(),
                owner_id: caller.user_id.clone(),
                created_at: Utc::now(),
            };
            store.organizations.push(organization.clone());
            store.memberships.push(Membership {
                user_id: caller.user_id.clone(),
                organization_id: organization.id.clone(),
                role: Role::Owner,
                created_at: Utc::now(),
            });

            record_activity(
                store,
                &organization.id,
                None,
                &caller.user_id,
                ActivityKind::MemberJoined,
                format!("joined {}", organization.name),
                None,
            );

            Ok(organization)
        })
    }

    pub async fn create_project(
        &mut self,
        caller: &CallerContext,
        organization_id: &str,
        name: &str,
        key: &str,
    ) -> Result<Project> {
        self.transact(|store| {
            let organization = store
                .organization(organization_id)
                .cloned()
                .ok_or_else(|| TaskverseError::OrganizationNotFound(organization_id.to_string()))?;
            auth::authorize(store, caller, &organization.id)?;

            if !is_valid_project_key(key) {
                return Err(TaskverseError::Validation(format!(
                    "invalid project key: {} (2-10 uppercase letters or digits, starting with a letter)",
                    key
                )));
            }
            if store.project_by_key(&organization.id, key).is_some() {
                return Err(TaskverseError::Conflict(format!(
                    "project key {} already exists in {}",
                    key, organization.name
                )));
            }

            let project = Project {
                id: store.allocate_id("prj"),
                organization_id: organization.id.clone(),
                name: name.trim().to_string(),
                key: key.to_string(),
                lead_id: Some(caller.user_id.clone()),
                created_at: Utc::now(),
            };
            store.projects.push(project.clone());

            // Every project starts with the default workflow.
            let defaults = [
                ("To Do", StatusCategory::Todo, 1),
                ("In Progress", StatusCategory::InProgress, 2),
                ("Done", StatusCategory::Done, 3),
            ];
            for (name, category, order) in defaults {
                let status = Status {
                    id: store.allocate_id("sts"),
                    project_id: project.id.clone(),
                    name: name.to_string(),
                    category,
                    order,
                };
                store.statuses.push(status);
            }

            record_activity(
                store,
                &organization.id,
                None,
                &caller.user_id,
                ActivityKind::ProjectCreated,
                format!("created project {} ({})", project.name, project.key),
                None,
            );

            Ok(project)
        })
    }

    /// Add an existing user to the organization. Admin tier only.
    pub async fn invite_member(
        &mut self,
        caller: &CallerContext,
        organization_id: &str,
        email: &str,
        role: Role,
    ) -> Result<Membership> {
        self.transact(|store| {
            let organization = store
                .organization(organization_id)
                .cloned()
                .ok_or_else(|| TaskverseError::OrganizationNotFound(organization_id.to_string()))?;
            let membership = auth::authorize(store, caller, &organization.id)?;
            auth::require_admin(membership)?;

            if role == Role::Owner {
                return Err(TaskverseError::Validation(
                    "the Owner role cannot be granted".into(),
                ));
            }

            let target = store
                .user_by_email(email)
                .cloned()
                .ok_or_else(|| TaskverseError::UserNotFound(email.to_string()))?;
            if store.find_membership(&target.id, &organization.id).is_some() {
                return Err(TaskverseError::Conflict(format!(
                    "{} is already a member of {}",
                    target.name, organization.name
                )));
            }

            let membership = Membership {
                user_id: target.id.clone(),
                organization_id: organization.id.clone(),
                role,
                created_at: Utc::now(),
            };
            store.memberships.push(membership.clone());

            record_activity(
                store,
                &organization.id,
                None,
                &caller.user_id,
                ActivityKind::MemberInvited,
                format!("invited {} as {}", target.name, role),
                None,
            );

            Ok(membership)
        })
    }

    pub async fn change_role(
        &mut self,
        caller: &CallerContext,
        organization_id: &str,
        email: &str,
        role: Role,
    ) -> Result<Membership> {
        self.transact(|store| {
            let organization = store
                .organization(organization_id)
                .cloned()
                .ok_or_else(|| TaskverseError::OrganizationNotFound(organization_id.to_string()))?;
            let membership = auth::authorize(store, caller, &organization.id)?;
            auth::require_admin(membership)?;

            if role == Role::Owner {
                return Err(TaskverseError::Validation(
                    "the Owner role cannot be granted".into(),
                ));
            }

            let target = store
                .user_by_email(email)
                .cloned()
                .ok_or_else(|| TaskverseError::UserNotFound(email.to_string()))?;
            auth::ensure_not_owner(&organization, &target.id)?;

            let membership = store
                .memberships
                .iter_mut()
                .find(|m| m.user_id == target.id && m.organization_id == organization.id)
                .ok_or_else(|| TaskverseError::MemberNotFound(target.name.clone()))?;
            membership.role = role;
            Ok(membership.clone())
        })
    }

    pub async fn remove_member(
        &mut self,
        caller: &CallerContext,
        organization_id: &str,
        email: &str,
    ) -> Result<()> {
        self.transact(|store| {
            let organization = store
                .organization(organization_id)
                .cloned()
                .ok_or_else(|| TaskverseError::OrganizationNotFound(organization_id.to_string()))?;
            let membership = auth::authorize(store, caller, &organization.id)?;
            auth::require_admin(membership)?;

            let target = store
                .user_by_email(email)
                .cloned()
                .ok_or_else(|| TaskverseError::UserNotFound(email.to_string()))?;
            auth::ensure_not_owner(&organization, &target.id)?;

            if store.find_membership(&target.id, &organization.id).is_none() {
                return Err(TaskverseError::MemberNotFound(target.name));
            }
            store
                .memberships
                .retain(|m| !(m.user_id == target.id && m.organization_id == organization.id));
            Ok(())
        })
    }

    /// Mark all of the caller's unread notifications read. Returns how many
    /// were flipped.
    pub async fn mark_notifications_read(&mut self, caller: &CallerContext) -> Result<usize> {
        self.transact(|store| {
            let mut count = 0;
            for n in store
                .notifications
                .iter_mut()
                .filter(|n| n.recipient_id == caller.user_id && !n.read)
            {
                n.read = true;
                count += 1;
            }
            Ok(count)
        })
    }

    /// Delete all of the caller's notifications. Returns how many were
    /// removed.
    pub async fn clear_notifications(&mut self, caller: &CallerContext) -> Result<usize> {
        self.transact(|store| {
            let before = store.notifications.len();
            store
                .notifications
                .retain(|n| n.recipient_id != caller.user_id);
            Ok(before - store.notifications.len())
        })
    }
}

fn load_issue_context(store: &Store, issue_id: &str) -> Result<(Issue, Project, Organization)> {
    let issue = store
        .issue(issue_id)
        .cloned()
        .ok_or_else(|| TaskverseError::IssueNotFound(issue_id.to_string()))?;
    let project = store
        .project(&issue.project_id)
        .cloned()
        .ok_or_else(|| TaskverseError::ProjectNotFound(issue.project_id.clone()))?;
    let organization = store
        .organization(&project.organization_id)
        .cloned()
        .ok_or_else(|| TaskverseError::OrganizationNotFound(project.organization_id.clone()))?;
    Ok((issue, project, organization))
}

fn edit_issue(store: &mut Store, issue_id: &str, f: impl FnOnce(&mut Issue)) -> Result<()> {
    let issue = store
        .issue_mut(issue_id)
        .ok_or_else(|| TaskverseError::IssueNotFound(issue_id.to_string()))?;
    f(issue);
    issue.updated_at = Utc::now();
    Ok(())
}

/// Shared assignment path for explicit edits and mention auto-assignment.
/// Old and new assignee are compared by id; an unchanged assignee is a
/// no-op with no activity.
fn apply_assignee(
    store: &mut Store,
    caller: &CallerContext,
    issue_id: &str,
    new_assignee: Option<String>,
) -> Result<(Vec<ActivityEntry>, Vec<Notification>)> {
    let (issue, project, organization) = load_issue_context(store, issue_id)?;
    if issue.assignee_id == new_assignee {
        return Ok((Vec::new(), Vec::new()));
    }

    let from_label = match &issue.assignee_id {
        Some(id) => store
            .user(id)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| id.clone()),
        None => "Unassigned".to_string(),
    };
    let to_label = match &new_assignee {
        Some(id) => {
            store
                .find_membership(id, &organization.id)
                .ok_or_else(|| TaskverseError::MemberNotFound(id.clone()))?;
            store
                .user(id)
                .map(|u| u.name.clone())
                .ok_or_else(|| TaskverseError::UserNotFound(id.clone()))?
        }
        None => "Unassigned".to_string(),
    };

    edit_issue(store, issue_id, |i| {
        i.assignee_id = new_assignee.clone();
    })?;

    let entry = record_activity(
        store,
        &organization.id,
        Some(issue_id),
        &caller.user_id,
        ActivityKind::AssigneeChanged,
        format!(
            "changed assignee of {} from {} to {}",
            issue.key, from_label, to_label
        ),
        Some(json!({ "from": issue.assignee_id, "to": new_assignee })),
    );

    let mut notifications = Vec::new();
    if let Some(id) = &new_assignee {
        if let Some(n) = notify(
            store,
            id,
            NotificationKind::Assignment,
            NotificationPayload {
                actor_id: caller.user_id.clone(),
                issue_key: issue.key.clone(),
                extra: None,
            },
            issue_url(&organization.slug, &project.key, &issue.key),
        ) {
            notifications.push(n);
        }
    }

    Ok((vec![entry], notifications))
}

fn is_valid_project_key(key: &str) -> bool {
    (2..=10).contains(&key.len())
        && key.chars().next().is_some_and(|c| c.is_ascii_uppercase())
        && key
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && !slug.starts_with('-')
        && !slug.ends_with('-')
        && slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::{issue_timeline, TimelineItem};
    use crate::mentions::mention_token;

    struct Fixture {
        engine: Engine,
        alice: CallerContext,
        bob: CallerContext,
        organization: Organization,
        project: Project,
    }

    fn ctx(user: &User) -> CallerContext {
        CallerContext {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        }
    }

    /// Alice owns the org, Bob is a plain member, project ALPHA has the
    /// default To Do / In Progress / Done workflow.
    async fn fixture() -> Fixture {
        let mut engine = Engine::new(Store::default());
        let alice_user = engine
            .register_user("Alice", "alice@example.com")
            .await
            .unwrap();
        let bob_user = engine.register_user("Bob", "bob@example.com").await.unwrap();
        let alice = ctx(&alice_user);
        let bob = ctx(&bob_user);

        let organization = engine
            .create_organization(&alice, "Demo Org", "demo-org")
            .await
            .unwrap();
        let project = engine
            .create_project(&alice, &organization.id, "Alpha Project", "ALPHA")
            .await
            .unwrap();
        engine
            .invite_member(&alice, &organization.id, "bob@example.com", Role::Member)
            .await
            .unwrap();

        Fixture {
            engine,
            alice,
            bob,
            organization,
            project,
        }
    }

    fn new_issue(project_id: &str, title: &str) -> CreateIssue {
        CreateIssue {
            project_id: project_id.to_string(),
            title: title.to_string(),
            ..CreateIssue::default()
        }
    }

    fn status_id_by_name(store: &Store, project_id: &str, name: &str) -> String {
        store
            .statuses_for_project(project_id)
            .into_iter()
            .find(|s| s.name == name)
            .map(|s| s.id.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_issue_keys_are_sequential_and_unique() {
        let mut f = fixture().await;
        let mut keys = Vec::new();
        for n in 1..=3 {
            let change = f
                .engine
                .create_issue(&f.alice, new_issue(&f.project.id, &format!("Issue {n}")))
                .await
                .unwrap();
            keys.push(change.issue.key);
        }
        assert_eq!(keys, ["ALPHA-1", "ALPHA-2", "ALPHA-3"]);
    }

    #[tokio::test]
    async fn test_create_issue_sets_reporter_and_records_creation() {
        let mut f = fixture().await;
        let change = f
            .engine
            .create_issue(&f.bob, new_issue(&f.project.id, "Set up database schema"))
            .await
            .unwrap();

        assert_eq!(change.issue.reporter_id, f.bob.user_id);
        assert!(change.issue.assignee_id.is_none());
        assert_eq!(change.activity.len(), 1);
        assert_eq!(change.activity[0].kind, ActivityKind::IssueCreated);

        let entries = f.engine.store().activity_for_issue(&change.issue.id);
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_create_issue_with_assignee_notifies_assignee() {
        let mut f = fixture().await;
        let mut req = new_issue(&f.project.id, "Needs an owner");
        req.assignee_id = Some(f.bob.user_id.clone());

        let change = f.engine.create_issue(&f.alice, req).await.unwrap();

        assert_eq!(change.activity.len(), 1);
        assert_eq!(change.notifications.len(), 1);
        assert_eq!(change.notifications[0].kind, NotificationKind::Assignment);
        assert_eq!(change.notifications[0].recipient_id, f.bob.user_id);
    }

    #[tokio::test]
    async fn test_assignee_change_emits_activity_and_notification() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Triage me"))
            .await
            .unwrap()
            .issue;

        let change = f
            .engine
            .update_issue(
                &f.alice,
                &issue.id,
                IssueEdit::Assignee(Some(f.bob.user_id.clone())),
            )
            .await
            .unwrap();

        assert_eq!(change.issue.assignee_id.as_deref(), Some(f.bob.user_id.as_str()));
        assert_eq!(change.activity.len(), 1);
        assert_eq!(change.activity[0].kind, ActivityKind::AssigneeChanged);
        assert_eq!(change.notifications.len(), 1);
        assert_eq!(change.notifications[0].recipient_id, f.bob.user_id);
    }

    #[tokio::test]
    async fn test_self_assignment_skips_notification() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Mine"))
            .await
            .unwrap()
            .issue;

        let change = f
            .engine
            .update_issue(
                &f.alice,
                &issue.id,
                IssueEdit::Assignee(Some(f.alice.user_id.clone())),
            )
            .await
            .unwrap();

        assert_eq!(change.activity.len(), 1);
        assert!(change.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_unchanged_assignee_is_a_noop() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Stable"))
            .await
            .unwrap()
            .issue;

        let change = f
            .engine
            .update_issue(&f.alice, &issue.id, IssueEdit::Assignee(None))
            .await
            .unwrap();

        assert!(change.activity.is_empty());
        assert!(change.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_assignee_must_be_an_organization_member() {
        let mut f = fixture().await;
        let carol = f
            .engine
            .register_user("Carol", "carol@example.com")
            .await
            .unwrap();
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Members only"))
            .await
            .unwrap()
            .issue;

        let before = f.engine.store().clone();
        let err = f
            .engine
            .update_issue(&f.alice, &issue.id, IssueEdit::Assignee(Some(carol.id)))
            .await
            .unwrap_err();

        assert!(matches!(err, TaskverseError::MemberNotFound(_)));
        assert_eq!(f.engine.store(), &before);
    }

    #[tokio::test]
    async fn test_status_change_records_from_and_to() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Move me"))
            .await
            .unwrap()
            .issue;
        let in_progress = status_id_by_name(f.engine.store(), &f.project.id, "In Progress");

        let change = f
            .engine
            .update_issue(&f.alice, &issue.id, IssueEdit::Status(in_progress.clone()))
            .await
            .unwrap();

        assert_eq!(change.issue.status_id, in_progress);
        assert_eq!(change.activity.len(), 1);
        let entry = &change.activity[0];
        assert_eq!(entry.kind, ActivityKind::StatusChanged);
        assert!(entry.message.contains("To Do"));
        assert!(entry.message.contains("In Progress"));
        assert_eq!(
            entry.metadata.as_ref().unwrap()["to"],
            serde_json::json!(in_progress)
        );
    }

    #[tokio::test]
    async fn test_status_change_to_unknown_status_fails() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Stuck"))
            .await
            .unwrap()
            .issue;

        let err = f
            .engine
            .update_issue(&f.alice, &issue.id, IssueEdit::Status("sts-999".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::StatusNotFound(_)));
    }

    #[tokio::test]
    async fn test_status_of_another_project_is_not_found() {
        let mut f = fixture().await;
        let bravo = f
            .engine
            .create_project(&f.alice, &f.organization.id, "Bravo Project", "BRAVO")
            .await
            .unwrap();
        let foreign = status_id_by_name(f.engine.store(), &bravo.id, "Done");
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Wrong board"))
            .await
            .unwrap()
            .issue;

        let err = f
            .engine
            .update_issue(&f.alice, &issue.id, IssueEdit::Status(foreign))
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::StatusNotFound(_)));
    }

    #[tokio::test]
    async fn test_non_member_mutation_leaves_store_untouched() {
        let mut f = fixture().await;
        let carol_user = f
            .engine
            .register_user("Carol", "carol@example.com")
            .await
            .unwrap();
        let carol = ctx(&carol_user);
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Private"))
            .await
            .unwrap()
            .issue;

        let before = f.engine.store().clone();
        let err = f
            .engine
            .update_issue(&carol, &issue.id, IssueEdit::Title("Hijacked".into()))
            .await
            .unwrap_err();

        assert!(matches!(err, TaskverseError::NotAuthorized));
        assert_eq!(f.engine.store(), &before);
    }

    #[tokio::test]
    async fn test_empty_comment_is_rejected() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Quiet"))
            .await
            .unwrap()
            .issue;

        let err = f
            .engine
            .create_comment(&f.alice, &issue.id, "   \n")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::Validation(_)));
        assert!(f.engine.store().comments.is_empty());
    }

    #[tokio::test]
    async fn test_single_mention_auto_assigns() {
        // The end-to-end scenario: Alice creates ALPHA-1, Bob comments
        // mentioning Alice. Alice becomes assignee; the log grows from 1
        // entry to 3 (ISSUE_CREATED, COMMENT_ADDED, ASSIGNEE_CHANGED).
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Take this"))
            .await
            .unwrap()
            .issue;
        assert_eq!(issue.key, "ALPHA-1");

        let alice_user = f.engine.store().user(&f.alice.user_id).unwrap().clone();
        let body = format!("{} please take this", mention_token(&alice_user));
        let change = f
            .engine
            .create_comment(&f.bob, &issue.id, &body)
            .await
            .unwrap();

        assert_eq!(
            change.issue.assignee_id.as_deref(),
            Some(f.alice.user_id.as_str())
        );
        let kinds: Vec<ActivityKind> = change.activity.iter().map(|a| a.kind).collect();
        assert_eq!(
            kinds,
            [ActivityKind::CommentAdded, ActivityKind::AssigneeChanged]
        );

        // One MENTION and one ASSIGNMENT, both to Alice.
        assert_eq!(change.notifications.len(), 2);
        assert!(change
            .notifications
            .iter()
            .all(|n| n.recipient_id == f.alice.user_id));
        assert!(change
            .notifications
            .iter()
            .any(|n| n.kind == NotificationKind::Mention));
        assert!(change
            .notifications
            .iter()
            .any(|n| n.kind == NotificationKind::Assignment));

        assert_eq!(f.engine.store().activity_for_issue(&issue.id).len(), 3);
    }

    #[tokio::test]
    async fn test_mentioning_yourself_assigns_without_notifications() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.bob, new_issue(&f.project.id, "Self service"))
            .await
            .unwrap()
            .issue;

        let alice_user = f.engine.store().user(&f.alice.user_id).unwrap().clone();
        let body = format!("I'll do it {}", mention_token(&alice_user));
        let change = f
            .engine
            .create_comment(&f.alice, &issue.id, &body)
            .await
            .unwrap();

        assert_eq!(
            change.issue.assignee_id.as_deref(),
            Some(f.alice.user_id.as_str())
        );
        // Actor == recipient on both the mention and the assignment.
        assert!(change.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_multiple_mentions_do_not_auto_assign() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Ambiguous"))
            .await
            .unwrap()
            .issue;

        let store = f.engine.store();
        let alice_user = store.user(&f.alice.user_id).unwrap().clone();
        let bob_user = store.user(&f.bob.user_id).unwrap().clone();
        let body = format!(
            "{} or {}, one of you?",
            mention_token(&alice_user),
            mention_token(&bob_user)
        );

        let change = f
            .engine
            .create_comment(&f.alice, &issue.id, &body)
            .await
            .unwrap();

        assert!(change.issue.assignee_id.is_none());
        assert_eq!(change.activity.len(), 1);
        assert_eq!(change.activity[0].kind, ActivityKind::CommentAdded);
        // Only Bob gets a mention notification; Alice is the author.
        assert_eq!(change.notifications.len(), 1);
        assert_eq!(change.notifications[0].recipient_id, f.bob.user_id);
        assert_eq!(change.notifications[0].kind, NotificationKind::Mention);
    }

    #[tokio::test]
    async fn test_mentioning_current_assignee_changes_nothing() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Already yours"))
            .await
            .unwrap()
            .issue;
        f.engine
            .update_issue(
                &f.alice,
                &issue.id,
                IssueEdit::Assignee(Some(f.alice.user_id.clone())),
            )
            .await
            .unwrap();

        let alice_user = f.engine.store().user(&f.alice.user_id).unwrap().clone();
        let body = format!("{} any progress?", mention_token(&alice_user));
        let change = f
            .engine
            .create_comment(&f.bob, &issue.id, &body)
            .await
            .unwrap();

        assert_eq!(change.activity.len(), 1);
        assert_eq!(change.activity[0].kind, ActivityKind::CommentAdded);
        // Mention notification still goes out; no assignment side effect.
        assert_eq!(change.notifications.len(), 1);
        assert_eq!(change.notifications[0].kind, NotificationKind::Mention);
    }

    #[tokio::test]
    async fn test_timeline_is_ordered() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "History"))
            .await
            .unwrap()
            .issue;
        let in_progress = status_id_by_name(f.engine.store(), &f.project.id, "In Progress");
        f.engine
            .update_issue(&f.alice, &issue.id, IssueEdit::Status(in_progress))
            .await
            .unwrap();
        f.engine
            .create_comment(&f.bob, &issue.id, "on it")
            .await
            .unwrap();

        let store = f.engine.store();
        let timeline = issue_timeline(store, &issue.id);
        assert_eq!(timeline.len(), 4); // created, moved, comment, commented

        let stamps: Vec<_> = timeline
            .iter()
            .map(|item| match item {
                TimelineItem::Comment(c) => c.created_at,
                TimelineItem::Activity(a) => a.created_at,
            })
            .collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
        assert!(matches!(
            timeline[0],
            TimelineItem::Activity(a) if a.kind == ActivityKind::IssueCreated
        ));
    }

    #[tokio::test]
    async fn test_duplicate_project_key_is_a_conflict() {
        let mut f = fixture().await;
        let err = f
            .engine
            .create_project(&f.alice, &f.organization.id, "Alpha Again", "ALPHA")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_invalid_project_key_is_rejected() {
        let mut f = fixture().await;
        for key in ["", "a", "alpha", "1ALPHA", "WAY-TOO-LONG-KEY"] {
            let err = f
                .engine
                .create_project(&f.alice, &f.organization.id, "Bad", key)
                .await
                .unwrap_err();
            assert!(matches!(err, TaskverseError::Validation(_)), "key: {key:?}");
        }
    }

    #[tokio::test]
    async fn test_owner_membership_cannot_be_removed() {
        let mut f = fixture().await;
        let before = f.engine.store().memberships.len();

        let err = f
            .engine
            .remove_member(&f.alice, &f.organization.id, "alice@example.com")
            .await
            .unwrap_err();

        assert!(matches!(err, TaskverseError::Forbidden(_)));
        assert_eq!(f.engine.store().memberships.len(), before);
    }

    #[tokio::test]
    async fn test_owner_role_cannot_be_changed() {
        let mut f = fixture().await;
        let err = f
            .engine
            .change_role(&f.alice, &f.organization.id, "alice@example.com", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_plain_members_cannot_administer() {
        let mut f = fixture().await;
        f.engine
            .register_user("Carol", "carol@example.com")
            .await
            .unwrap();

        let err = f
            .engine
            .invite_member(&f.bob, &f.organization.id, "carol@example.com", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_admin_can_change_role_and_remove() {
        let mut f = fixture().await;
        f.engine
            .change_role(&f.alice, &f.organization.id, "bob@example.com", Role::Admin)
            .await
            .unwrap();
        let membership = f
            .engine
            .store()
            .find_membership(&f.bob.user_id, &f.organization.id)
            .unwrap();
        assert_eq!(membership.role, Role::Admin);

        f.engine
            .remove_member(&f.alice, &f.organization.id, "bob@example.com")
            .await
            .unwrap();
        assert!(f
            .engine
            .store()
            .find_membership(&f.bob.user_id, &f.organization.id)
            .is_none());
    }

    #[tokio::test]
    async fn test_invite_records_activity_and_rejects_duplicates() {
        let mut f = fixture().await;
        let invited = f
            .engine
            .store()
            .activity
            .iter()
            .filter(|a| a.kind == ActivityKind::MemberInvited)
            .count();
        assert_eq!(invited, 1); // Bob's invite from the fixture

        let err = f
            .engine
            .invite_member(&f.alice, &f.organization.id, "bob@example.com", Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_registration_conflicts() {
        let mut f = fixture().await;
        let err = f
            .engine
            .register_user("Alice Clone", "alice@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, TaskverseError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_notifications_read_and_clear_are_caller_scoped() {
        let mut f = fixture().await;
        let issue = f
            .engine
            .create_issue(&f.alice, new_issue(&f.project.id, "Busy"))
            .await
            .unwrap()
            .issue;
        // One assignment notification for Bob, one for Alice.
        f.engine
            .update_issue(
                &f.alice,
                &issue.id,
                IssueEdit::Assignee(Some(f.bob.user_id.clone())),
            )
            .await
            .unwrap();
        f.engine
            .update_issue(
                &f.bob,
                &issue.id,
                IssueEdit::Assignee(Some(f.alice.user_id.clone())),
            )
            .await
            .unwrap();

        let flipped = f.engine.mark_notifications_read(&f.bob).await.unwrap();
        assert_eq!(flipped, 1);
        let store = f.engine.store();
        assert!(store.notifications_for(&f.bob.user_id).iter().all(|n| n.read));
        assert!(store
            .notifications_for(&f.alice.user_id)
            .iter()
            .all(|n| !n.read));

        let removed = f.engine.clear_notifications(&f.bob).await.unwrap();
        assert_eq!(removed, 1);
        assert!(f.engine.store().notifications_for(&f.bob.user_id).is_empty());
        assert_eq!(f.engine.store().notifications_for(&f.alice.user_id).len(), 1);
    }
}

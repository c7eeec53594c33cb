//! Client-side reconciliation of optimistic updates with server authority.
//!
//! The board and the detail panel each hold their own copy of an issue.
//! A mutation is applied to both copies immediately, the pipeline is awaited
//! with a request timeout, and the outcome either keeps the optimistic state
//! (merging in server-resolved fields through the same path) or restores the
//! entire pre-mutation snapshot verbatim. A view torn down while a request
//! is in flight has its result ignored; the server-side mutation still
//! completes.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

use crate::engine::IssueChange;
use crate::error::{Result, TaskverseError};
use crate::store::Store;
use crate::types::{Issue, Status, User};

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// An issue together with the resolved records the views render.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueView {
    pub issue: Issue,
    pub status: Status,
    pub assignee: Option<User>,
}

/// One board column: a status and the issues currently in it.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub status: Status,
    pub issues: Vec<IssueView>,
}

/// Local view-state for one project: the board columns plus the detail
/// panel's independent copy of a single issue.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientState {
    pub columns: Vec<Column>,
    pub detail: Option<IssueView>,
    request_timeout: Duration,
}

/// Token for one in-flight mutation, holding the immutable pre-mutation
/// snapshot. Consumed by submit or rollback; one outstanding mutation per
/// issue is assumed.
#[derive(Debug)]
pub struct PendingMutation {
    pub issue_id: String,
    snapshot: Box<ClientState>,
}

/// Resolve the derived view fields for an issue from server state.
pub fn resolve_view(store: &Store, issue: &Issue) -> Result<IssueView> {
    let status = store
        .status(&issue.status_id)
        .cloned()
        .ok_or_else(|| TaskverseError::StatusNotFound(issue.status_id.clone()))?;
    let assignee = match &issue.assignee_id {
        Some(id) => Some(
            store
                .user(id)
                .cloned()
                .ok_or_else(|| TaskverseError::UserNotFound(id.clone()))?,
        ),
        None => None,
    };
    Ok(IssueView {
        issue: issue.clone(),
        status,
        assignee,
    })
}

impl ClientState {
    /// Build the board for a project from current server state.
    pub fn from_store(store: &Store, project_id: &str) -> Result<Self> {
        let mut columns: Vec<Column> = store
            .statuses_for_project(project_id)
            .into_iter()
            .map(|status| Column {
                status: status.clone(),
                issues: Vec::new(),
            })
            .collect();

        for issue in store.issues_for_project(project_id) {
            let view = resolve_view(store, issue)?;
            if let Some(column) = columns.iter_mut().find(|c| c.status.id == issue.status_id) {
                column.issues.push(view);
            }
        }

        Ok(ClientState {
            columns,
            detail: None,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn find(&self, issue_id: &str) -> Option<&IssueView> {
        self.columns
            .iter()
            .flat_map(|c| c.issues.iter())
            .find(|v| v.issue.id == issue_id)
    }

    /// Open the detail panel on an issue, taking an independent copy.
    pub fn open_detail(&mut self, issue_id: &str) -> bool {
        match self.find(issue_id).cloned() {
            Some(view) => {
                self.detail = Some(view);
                true
            }
            None => false,
        }
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    /// The optimistic view for a local status move, resolved against the
    /// board's own column statuses.
    pub fn optimistic_status(&self, issue_id: &str, status_id: &str) -> Option<IssueView> {
        let status = self
            .columns
            .iter()
            .map(|c| &c.status)
            .find(|s| s.id == status_id)?
            .clone();
        let mut view = self.find(issue_id)?.clone();
        view.issue.status_id = status.id.clone();
        view.status = status;
        Some(view)
    }

    /// Phase one: capture the pre-mutation snapshot as an immutable value,
    /// then apply the optimistic view to every open copy.
    pub fn begin(&mut self, optimistic: IssueView) -> PendingMutation {
        let pending = PendingMutation {
            issue_id: optimistic.issue.id.clone(),
            snapshot: Box::new(self.clone()),
        };
        self.merge_view(optimistic);
        pending
    }

    /// The single merge path: board and detail receive the same view, so
    /// the two copies of an issue can never diverge. A closed detail panel
    /// is skipped (torn-down views ignore results).
    pub fn merge_view(&mut self, view: IssueView) {
        let issue_id = view.issue.id.clone();
        let dest_status_id = view.issue.status_id.clone();

        for column in &mut self.columns {
            column.issues.retain(|v| v.issue.id != issue_id);
        }
        if let Some(column) = self
            .columns
            .iter_mut()
            .find(|c| c.status.id == dest_status_id)
        {
            column.issues.push(view.clone());
        }

        if let Some(detail) = &mut self.detail {
            if detail.issue.id == issue_id {
                *detail = view;
            }
        }
    }

    /// Phase two, failure: restore the entire pre-mutation snapshot
    /// verbatim — never a partial patch. A detail panel closed while the
    /// request was in flight stays closed.
    pub fn rollback(&mut self, pending: PendingMutation) {
        let detail_closed = self.detail.is_none();
        *self = *pending.snapshot;
        if detail_closed {
            self.detail = None;
        }
    }

    /// Phase two: await the pipeline with the request timeout. A timeout
    /// is treated exactly like a rejected mutation: the snapshot is
    /// restored and the error returned. On success the optimistic state is
    /// kept and the pending token retired; the caller then resolves the
    /// server view and merges it in via `merge_view`.
    pub async fn submit<F>(&mut self, pending: PendingMutation, request: F) -> Result<IssueChange>
    where
        F: Future<Output = Result<IssueChange>>,
    {
        match timeout(self.request_timeout, request).await {
            Ok(Ok(change)) => Ok(change),
            Ok(Err(err)) => {
                self.rollback(pending);
                Err(err)
            }
            Err(_) => {
                self.rollback(pending);
                Err(TaskverseError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{CreateIssue, Engine};
    use crate::session::CallerContext;
    use crate::types::IssueEdit;

    struct Fixture {
        engine: Engine,
        caller: CallerContext,
        project_id: String,
    }

    async fn fixture() -> Fixture {
        let mut engine = Engine::new(Store::default());
        let user = engine
            .register_user("Alice", "alice@example.com")
            .await
            .unwrap();
        let caller = CallerContext {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        };
        let organization = engine
            .create_organization(&caller, "Demo Org", "demo-org")
            .await
            .unwrap();
        let project = engine
            .create_project(&caller, &organization.id, "Alpha Project", "ALPHA")
            .await
            .unwrap();
        engine
            .create_issue(
                &caller,
                CreateIssue {
                    project_id: project.id.clone(),
                    title: "Drag me".into(),
                    ..CreateIssue::default()
                },
            )
            .await
            .unwrap();

        Fixture {
            engine,
            caller,
            project_id: project.id,
        }
    }

    fn column_status_id(client: &ClientState, name: &str) -> String {
        client
            .columns
            .iter()
            .find(|c| c.status.name == name)
            .map(|c| c.status.id.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_optimistic_apply_updates_board_and_detail() {
        let f = fixture().await;
        let mut client = ClientState::from_store(f.engine.store(), &f.project_id).unwrap();
        let issue_id = client.columns[0].issues[0].issue.id.clone();
        assert!(client.open_detail(&issue_id));

        let in_progress = column_status_id(&client, "In Progress");
        let optimistic = client.optimistic_status(&issue_id, &in_progress).unwrap();
        let _pending = client.begin(optimistic);

        assert!(client.columns[0].issues.is_empty());
        assert_eq!(client.columns[1].issues.len(), 1);
        assert_eq!(
            client.detail.as_ref().unwrap().issue.status_id,
            in_progress
        );
        // Board copy and detail copy stay identical.
        assert_eq!(client.find(&issue_id), client.detail.as_ref());
    }

    #[tokio::test]
    async fn test_commit_keeps_state_and_merges_server_view() {
        let mut f = fixture().await;
        let mut client = ClientState::from_store(f.engine.store(), &f.project_id).unwrap();
        let issue_id = client.columns[0].issues[0].issue.id.clone();
        client.open_detail(&issue_id);

        let in_progress = column_status_id(&client, "In Progress");
        let optimistic = client.optimistic_status(&issue_id, &in_progress).unwrap();
        let pending = client.begin(optimistic);

        let change = client
            .submit(
                pending,
                f.engine
                    .update_issue(&f.caller, &issue_id, IssueEdit::Status(in_progress.clone())),
            )
            .await
            .unwrap();
        let view = resolve_view(f.engine.store(), &change.issue).unwrap();
        client.merge_view(view);

        assert_eq!(client.columns[1].issues.len(), 1);
        assert_eq!(
            client.detail.as_ref().unwrap().status.name,
            "In Progress"
        );
        assert_eq!(
            f.engine.store().issue(&issue_id).unwrap().status_id,
            in_progress
        );
    }

    #[tokio::test]
    async fn test_rejected_mutation_rolls_back_byte_equal() {
        let mut f = fixture().await;
        let mut client = ClientState::from_store(f.engine.store(), &f.project_id).unwrap();
        let issue_id = client.columns[0].issues[0].issue.id.clone();
        client.open_detail(&issue_id);

        let before = client.clone();
        let in_progress = column_status_id(&client, "In Progress");
        let optimistic = client.optimistic_status(&issue_id, &in_progress).unwrap();
        let pending = client.begin(optimistic);
        assert_ne!(client, before);

        // Unknown destination status: the pipeline rejects and nothing was
        // persisted.
        let result = client
            .submit(
                pending,
                f.engine
                    .update_issue(&f.caller, &issue_id, IssueEdit::Status("sts-999".into())),
            )
            .await;

        assert!(matches!(result, Err(TaskverseError::StatusNotFound(_))));
        assert_eq!(client, before);
    }

    #[tokio::test]
    async fn test_timeout_is_treated_as_failure() {
        let f = fixture().await;
        let mut client = ClientState::from_store(f.engine.store(), &f.project_id)
            .unwrap()
            .with_timeout(Duration::from_millis(20));
        let issue_id = client.columns[0].issues[0].issue.id.clone();

        let before = client.clone();
        let in_progress = column_status_id(&client, "In Progress");
        let optimistic = client.optimistic_status(&issue_id, &in_progress).unwrap();
        let pending = client.begin(optimistic);

        let result = client
            .submit(pending, async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                unreachable!("the request should have timed out first")
            })
            .await;

        assert!(matches!(result, Err(TaskverseError::Timeout)));
        assert_eq!(client, before);
    }

    #[tokio::test]
    async fn test_closed_detail_ignores_results() {
        let mut f = fixture().await;
        let mut client = ClientState::from_store(f.engine.store(), &f.project_id).unwrap();
        let issue_id = client.columns[0].issues[0].issue.id.clone();
        client.open_detail(&issue_id);

        let in_progress = column_status_id(&client, "In Progress");
        let optimistic = client.optimistic_status(&issue_id, &in_progress).unwrap();
        let pending = client.begin(optimistic);

        // Panel is torn down while the request is in flight.
        client.close_detail();

        let change = client
            .submit(
                pending,
                f.engine
                    .update_issue(&f.caller, &issue_id, IssueEdit::Status(in_progress.clone())),
            )
            .await
            .unwrap();
        let view = resolve_view(f.engine.store(), &change.issue).unwrap();
        client.merge_view(view);

        // The board merged the result; the closed panel stayed closed, and
        // the server-side mutation completed regardless.
        assert!(client.detail.is_none());
        assert_eq!(client.columns[1].issues.len(), 1);
        assert_eq!(
            f.engine.store().issue(&issue_id).unwrap().status_id,
            in_progress
        );
    }

    #[tokio::test]
    async fn test_rollback_after_detail_closed_keeps_it_closed() {
        let mut f = fixture().await;
        let mut client = ClientState::from_store(f.engine.store(), &f.project_id).unwrap();
        let issue_id = client.columns[0].issues[0].issue.id.clone();
        client.open_detail(&issue_id);

        let in_progress = column_status_id(&client, "In Progress");
        let optimistic = client.optimistic_status(&issue_id, &in_progress).unwrap();
        let pending = client.begin(optimistic);

        client.close_detail();

        let result = client
            .submit(
                pending,
                f.engine
                    .update_issue(&f.caller, &issue_id, IssueEdit::Status("sts-999".into())),
            )
            .await;

        assert!(result.is_err());
        // Board rolled back, but the torn-down panel did not reappear.
        assert_eq!(client.columns[0].issues.len(), 1);
        assert!(client.detail.is_none());
    }
}

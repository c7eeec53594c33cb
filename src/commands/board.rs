use std::time::Duration;

use serde_json::json;

use crate::config::Config;
use crate::error::{Result, TaskverseError};
use crate::output::{self, status_colored, truncate};
use crate::reconcile::{self, ClientState};
use crate::types::IssueEdit;

use super::{status_by_name, Workspace};

pub async fn show(ws: &Workspace, config: &Config, project: Option<&str>) -> Result<()> {
    let project = ws.resolve_project(config, project)?;
    let state = ClientState::from_store(ws.store(), &project.id)?;

    if output::is_json_output() {
        let columns: Vec<_> = state
            .columns
            .iter()
            .map(|c| {
                json!({
                    "status": c.status,
                    "issues": c.issues.iter().map(|v| &v.issue).collect::<Vec<_>>(),
                })
            })
            .collect();
        let payload = json!({ "project": project, "columns": columns });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{} ({})", project.name, project.key);
    for column in &state.columns {
        println!();
        println!(
            "{} ({})",
            status_colored(&column.status.name, column.status.category),
            column.issues.len()
        );
        for view in &column.issues {
            let assignee = view
                .assignee
                .as_ref()
                .map(|u| format!(" [{}]", u.name))
                .unwrap_or_default();
            println!(
                "  {:<10} {}{}",
                view.issue.key,
                truncate(&view.issue.title, 60),
                assignee
            );
        }
    }
    Ok(())
}

/// Move an issue to another column. The move is applied to the local board
/// first, submitted through the pipeline with the request timeout, and
/// rolled back to the pre-move snapshot if the pipeline rejects it or
/// times out.
pub async fn move_issue(
    ws: &mut Workspace,
    config: &Config,
    key: &str,
    status_name: &str,
) -> Result<()> {
    let issue = ws.resolve_issue(key)?;
    let dest = status_by_name(ws.store(), &issue.project_id, status_name)?.clone();

    let mut state = ClientState::from_store(ws.store(), &issue.project_id)?;
    if let Some(secs) = config.request_timeout {
        state = state.with_timeout(Duration::from_secs(secs));
    }
    state.open_detail(&issue.id);
    let optimistic = state
        .optimistic_status(&issue.id, &dest.id)
        .ok_or_else(|| TaskverseError::IssueNotFound(key.to_string()))?;
    let pending = state.begin(optimistic);
    let moved_id = pending.issue_id.clone();

    let change = state
        .submit(
            pending,
            ws.engine
                .update_issue(&ws.caller, &issue.id, IssueEdit::Status(dest.id.clone())),
        )
        .await?;

    let view = reconcile::resolve_view(ws.store(), &change.issue)?;
    state.merge_view(view);
    state.close_detail();
    ws.save()?;

    let column = state
        .find(&moved_id)
        .map(|v| v.status.name.clone())
        .unwrap_or(dest.name);
    output::print_item(&change, |change| {
        println!("Moved {} to {}", change.issue.key, column);
    });
    Ok(())
}

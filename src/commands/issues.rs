use chrono::NaiveDate;
use serde_json::json;
use tabled::Tabled;

use crate::activity::TimelineItem;
use crate::cli::{IssueCreateArgs, IssueListArgs, IssueUpdateArgs};
use crate::config::Config;
use crate::engine::CreateIssue;
use crate::error::{Result, TaskverseError};
use crate::mentions::{mention_token, parse_mentions, render_mentions};
use crate::output::{self, format_date, format_date_only, format_relative, status_colored, truncate};
use crate::types::{Issue, IssueEdit};

use super::{status_by_name, Workspace};

#[derive(Tabled)]
struct IssueRow {
    #[tabled(rename = "Key")]
    key: String,
    #[tabled(rename = "Type")]
    issue_type: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn issue_row(ws: &Workspace, issue: &Issue) -> IssueRow {
    let status = ws
        .store()
        .status(&issue.status_id)
        .map(|s| status_colored(&s.name, s.category))
        .unwrap_or_default();
    let assignee = issue
        .assignee_id
        .as_deref()
        .map(|id| ws.actor_name(id))
        .unwrap_or_default();

    IssueRow {
        key: issue.key.clone(),
        issue_type: issue.issue_type.to_string(),
        title: truncate(&issue.title, 50),
        status,
        priority: issue.priority.colored(),
        assignee,
        updated: format_relative(&issue.updated_at.to_rfc3339()),
    }
}

/// CLI convenience: let people type `@alice@example.com` and rewrite it to
/// the canonical id-addressed token before the body is stored. Emails that
/// match no user are left as typed.
fn expand_mentions(ws: &Workspace, body: &str) -> String {
    let re = regex::Regex::new(r"@([A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,})").unwrap();
    re.replace_all(body, |caps: &regex::Captures| {
        match ws.store().user_by_email(&caps[1]) {
            Some(user) => mention_token(user),
            None => caps[0].to_string(),
        }
    })
    .into_owned()
}

fn parse_due(arg: &str) -> Result<Option<NaiveDate>> {
    if arg == "none" {
        return Ok(None);
    }
    NaiveDate::parse_from_str(arg, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| TaskverseError::Validation(format!("invalid date: {arg} (expected YYYY-MM-DD)")))
}

pub async fn list(ws: &Workspace, config: &Config, args: IssueListArgs) -> Result<()> {
    let project = ws.resolve_project(config, args.project.as_deref())?;

    let status_filter = args.status.as_deref().map(str::to_lowercase);
    let issues: Vec<Issue> = ws
        .store()
        .issues_for_project(&project.id)
        .into_iter()
        .filter(|i| !args.mine || i.assignee_id.as_deref() == Some(ws.caller.user_id.as_str()))
        .filter(|i| match &status_filter {
            Some(name) => ws
                .store()
                .status(&i.status_id)
                .is_some_and(|s| s.name.to_lowercase().contains(name)),
            None => true,
        })
        .filter(|i| args.issue_type.is_none_or(|t| i.issue_type == t))
        .take(args.limit)
        .cloned()
        .collect();

    output::print_table(&issues, |issue| issue_row(ws, issue));
    Ok(())
}

pub async fn show(ws: &Workspace, key: &str) -> Result<()> {
    let issue = ws.resolve_issue(key)?;
    let project = ws
        .store()
        .project(&issue.project_id)
        .ok_or_else(|| TaskverseError::ProjectNotFound(issue.project_id.clone()))?;
    let status = ws
        .store()
        .status(&issue.status_id)
        .ok_or_else(|| TaskverseError::StatusNotFound(issue.status_id.clone()))?;

    if output::is_json_output() {
        let payload = json!({
            "issue": issue,
            "comments": ws.store().comments_for_issue(&issue.id),
            "activity": ws.store().activity_for_issue(&issue.id),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&payload).unwrap_or_default()
        );
        return Ok(());
    }

    println!("{} - {}", issue.key, issue.title);
    println!();

    if let Some(desc) = &issue.description {
        println!("{}", render_mentions(desc));
        println!();
    }

    println!("Project:  {} ({})", project.name, project.key);
    println!("Type:     {}", issue.issue_type);
    println!("Status:   {}", status_colored(&status.name, status.category));
    println!("Priority: {}", issue.priority.colored());
    println!(
        "Assignee: {}",
        issue
            .assignee_id
            .as_deref()
            .map(|id| ws.actor_name(id))
            .unwrap_or_else(|| "-".to_string())
    );
    println!("Reporter: {}", ws.actor_name(&issue.reporter_id));
    if let Some(due) = issue.due_date {
        println!("Due:      {}", due.format("%Y-%m-%d"));
    }
    println!(
        "Created:  {}",
        format_relative(&issue.created_at.to_rfc3339())
    );

    let timeline = crate::activity::issue_timeline(ws.store(), &issue.id);
    if !timeline.is_empty() {
        println!();
        for item in timeline {
            match item {
                TimelineItem::Comment(c) => {
                    println!(
                        "[{}] {}: {}",
                        format_date(&c.created_at.to_rfc3339()),
                        ws.actor_name(&c.author_id),
                        render_mentions(&c.body)
                    );
                }
                TimelineItem::Activity(a) => {
                    println!(
                        "[{}] {} {}",
                        format_date(&a.created_at.to_rfc3339()),
                        ws.actor_name(&a.actor_id),
                        a.message
                    );
                }
            }
        }
    }

    Ok(())
}

pub async fn create(ws: &mut Workspace, config: &Config, args: IssueCreateArgs) -> Result<()> {
    let project = ws.resolve_project(config, args.project.as_deref())?;

    let status_id = match &args.status {
        Some(name) => Some(status_by_name(ws.store(), &project.id, name)?.id.clone()),
        None => None,
    };
    let assignee_id = match &args.assignee {
        Some(arg) => ws.resolve_assignee(arg)?,
        None => None,
    };
    let due_date = match &args.due {
        Some(arg) => parse_due(arg)?,
        None => None,
    };

    let req = CreateIssue {
        project_id: project.id.clone(),
        title: args.title,
        description: args.description,
        issue_type: args.issue_type,
        priority: args.priority,
        status_id,
        assignee_id,
        due_date,
    };

    let change = ws.engine.create_issue(&ws.caller, req).await?;
    ws.save()?;

    output::print_item(&change, |change| {
        println!("Created {} - {}", change.issue.key, change.issue.title);
        if !change.notifications.is_empty() {
            println!("Notified {} member(s)", change.notifications.len());
        }
    });
    Ok(())
}

pub async fn update(ws: &mut Workspace, args: IssueUpdateArgs) -> Result<()> {
    let issue = ws.resolve_issue(&args.key)?;

    // One logical field per pipeline call; multi-flag invocations are
    // submitted as a sequence of single-field edits, in declared order.
    let mut edits: Vec<IssueEdit> = Vec::new();
    if let Some(title) = args.title {
        edits.push(IssueEdit::Title(title));
    }
    if let Some(desc) = args.description {
        let desc = if desc == "none" { None } else { Some(desc) };
        edits.push(IssueEdit::Description(desc));
    }
    if let Some(issue_type) = args.issue_type {
        edits.push(IssueEdit::Type(issue_type));
    }
    if let Some(priority) = args.priority {
        edits.push(IssueEdit::Priority(priority));
    }
    if let Some(due) = args.due {
        edits.push(IssueEdit::DueDate(parse_due(&due)?));
    }
    if let Some(assignee) = args.assignee {
        edits.push(IssueEdit::Assignee(ws.resolve_assignee(&assignee)?));
    }
    if let Some(status) = args.status {
        let status = status_by_name(ws.store(), &issue.project_id, &status)?;
        edits.push(IssueEdit::Status(status.id.clone()));
    }

    if edits.is_empty() {
        output::print_message("No updates specified");
        return Ok(());
    }

    let fields: Vec<&str> = edits.iter().map(|e| e.field_name()).collect();
    let mut changes = Vec::with_capacity(edits.len());
    for edit in edits {
        changes.push(ws.engine.update_issue(&ws.caller, &issue.id, edit).await?);
    }
    ws.save()?;

    output::print_item(&changes, |changes| {
        println!("Updated {} ({})", args.key, fields.join(", "));
        for change in changes {
            for entry in &change.activity {
                println!("  {}", entry.message);
            }
        }
    });
    Ok(())
}

pub async fn comment(ws: &mut Workspace, key: &str, body: &str) -> Result<()> {
    let issue = ws.resolve_issue(key)?;
    let body = expand_mentions(ws, body);
    for mention in parse_mentions(&body) {
        if ws.store().user(&mention.user_id).is_none() {
            output::print_message(&format!(
                "Note: @{} does not match any member and will not be notified",
                mention.display
            ));
        }
    }
    let change = ws
        .engine
        .create_comment(&ws.caller, &issue.id, &body)
        .await?;
    ws.save()?;

    output::print_item(&change, |change| {
        println!("Commented on {}", change.issue.key);
        for entry in &change.activity {
            println!("  {}", entry.message);
        }
        if !change.notifications.is_empty() {
            println!("Notified {} member(s)", change.notifications.len());
        }
    });
    Ok(())
}

pub async fn activity(ws: &Workspace, key: &str) -> Result<()> {
    let issue = ws.resolve_issue(key)?;
    let entries: Vec<_> = ws
        .store()
        .activity_for_issue(&issue.id)
        .into_iter()
        .cloned()
        .collect();

    if output::is_json_output() {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).unwrap_or_default()
        );
        return Ok(());
    }

    if entries.is_empty() {
        println!("No activity on {} yet", issue.key);
        return Ok(());
    }

    for entry in &entries {
        println!(
            "[{}] {} {} {}",
            format_date_only(&entry.created_at.to_rfc3339()),
            entry.kind,
            ws.actor_name(&entry.actor_id),
            entry.message
        );
    }
    Ok(())
}

use colored::Colorize;

use crate::error::Result;
use crate::output::{self, format_relative};
use crate::types::{Notification, NotificationKind};

use super::Workspace;

/// Render a stored notification payload to a message line. Actor names are
/// resolved at display time, so renames show up in old notifications too.
fn render(ws: &Workspace, n: &Notification) -> String {
    let actor = ws.actor_name(&n.payload.actor_id);
    let mut message = match n.kind {
        NotificationKind::Mention => {
            format!("{} mentioned you on {}", actor, n.payload.issue_key)
        }
        NotificationKind::Assignment => {
            format!("{} assigned you to {}", actor, n.payload.issue_key)
        }
    };
    if let Some(extra) = &n.payload.extra {
        message.push_str(": ");
        message.push_str(extra);
    }
    message
}

pub async fn list(ws: &Workspace) -> Result<()> {
    let notifications: Vec<Notification> = ws
        .store()
        .notifications_for(&ws.caller.user_id)
        .into_iter()
        .cloned()
        .collect();

    if output::is_json_output() {
        println!(
            "{}",
            serde_json::to_string_pretty(&notifications).unwrap_or_default()
        );
        return Ok(());
    }

    if notifications.is_empty() {
        println!("No notifications");
        return Ok(());
    }

    for n in &notifications {
        let marker = if n.read { " " } else { "*" };
        let line = format!(
            "{} {} ({})  {}",
            marker,
            render(ws, n),
            format_relative(&n.created_at.to_rfc3339()),
            n.url.bright_black()
        );
        if n.read {
            println!("{}", line.bright_black());
        } else {
            println!("{line}");
        }
    }
    Ok(())
}

pub async fn mark_read(ws: &mut Workspace) -> Result<()> {
    let count = ws.engine.mark_notifications_read(&ws.caller).await?;
    ws.save()?;
    output::print_message(&format!("Marked {count} notification(s) read"));
    Ok(())
}

pub async fn clear(ws: &mut Workspace) -> Result<()> {
    let count = ws.engine.clear_notifications(&ws.caller).await?;
    ws.save()?;
    output::print_message(&format!("Cleared {count} notification(s)"));
    Ok(())
}

//! Durable, ordered activity log and notification fan-out.
//!
//! Both writers run inside the engine's store transaction, so an activity
//! entry or notification commits together with the state change that caused
//! it, or not at all.

use chrono::Utc;

use crate::store::Store;
use crate::types::{
    ActivityEntry, ActivityKind, Comment, Notification, NotificationKind, NotificationPayload,
};

/// Append one activity entry.
pub fn record_activity(
    store: &mut Store,
    organization_id: &str,
    issue_id: Option<&str>,
    actor_id: &str,
    kind: ActivityKind,
    message: String,
    metadata: Option<serde_json::Value>,
) -> ActivityEntry {
    let entry = ActivityEntry {
        id: store.allocate_id("act"),
        organization_id: organization_id.to_string(),
        issue_id: issue_id.map(str::to_string),
        kind,
        actor_id: actor_id.to_string(),
        message,
        metadata,
        created_at: Utc::now(),
        seq: store.next_seq(),
    };
    store.activity.push(entry.clone());
    entry
}

/// Create a notification for `recipient_id`. A user is never notified about
/// their own action: actor == recipient returns None without writing.
pub fn notify(
    store: &mut Store,
    recipient_id: &str,
    kind: NotificationKind,
    payload: NotificationPayload,
    url: String,
) -> Option<Notification> {
    if recipient_id == payload.actor_id {
        return None;
    }

    let notification = Notification {
        id: store.allocate_id("ntf"),
        recipient_id: recipient_id.to_string(),
        kind,
        payload,
        url,
        read: false,
        created_at: Utc::now(),
    };
    store.notifications.push(notification.clone());
    Some(notification)
}

/// Deep link into the board view for an issue.
pub fn issue_url(org_slug: &str, project_key: &str, issue_key: &str) -> String {
    format!("/{}/{}/board?issue={}", org_slug, project_key, issue_key)
}

/// One item of the merged per-issue timeline.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineItem<'a> {
    Comment(&'a Comment),
    Activity(&'a ActivityEntry),
}

impl TimelineItem<'_> {
    fn sort_key(&self) -> (chrono::DateTime<Utc>, u64) {
        match self {
            TimelineItem::Comment(c) => (c.created_at, c.seq),
            TimelineItem::Activity(a) => (a.created_at, a.seq),
        }
    }
}

/// Comments and activity entries for an issue merged into one timeline,
/// ordered by created_at ascending, ties broken by insertion order.
pub fn issue_timeline<'a>(store: &'a Store, issue_id: &str) -> Vec<TimelineItem<'a>> {
    let mut items: Vec<TimelineItem<'a>> = store
        .comments_for_issue(issue_id)
        .into_iter()
        .map(TimelineItem::Comment)
        .chain(
            store
                .activity_for_issue(issue_id)
                .into_iter()
                .map(TimelineItem::Activity),
        )
        .collect();
    items.sort_by_key(|item| item.sort_key());
    items
}

mod activity;
mod comment;
mod issue;
mod member;
mod notification;
mod organization;
mod priority;
mod project;
mod status;
mod user;

pub use activity::{ActivityEntry, ActivityKind};
pub use comment::Comment;
pub use issue::{Issue, IssueEdit, IssueType};
pub use member::{Membership, Role};
pub use notification::{Notification, NotificationKind, NotificationPayload};
pub use organization::Organization;
pub use priority::Priority;
pub use project::Project;
pub use status::{Status, StatusCategory};
pub use user::User;

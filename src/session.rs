use crate::error::{Result, TaskverseError};
use crate::store::Store;

/// The resolved caller identity, passed explicitly into every engine entry
/// point. There is no ambient session state.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub user_id: String,
    pub name: String,
    pub email: String,
}

impl CallerContext {
    /// Resolve the acting user by email. A missing or unknown user fails
    /// every entry point with NotAuthenticated.
    pub fn resolve(store: &Store, email: Option<&str>) -> Result<Self> {
        let email = email.ok_or(TaskverseError::NotAuthenticated)?;
        let user = store
            .user_by_email(email)
            .ok_or(TaskverseError::NotAuthenticated)?;
        Ok(CallerContext {
            user_id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::User;

    #[test]
    fn test_resolve_known_user() {
        let mut store = Store::default();
        store.users.push(User {
            id: "usr-1".into(),
            name: "Demo User".into(),
            email: "demo@taskverse.dev".into(),
        });

        let caller = CallerContext::resolve(&store, Some("demo@taskverse.dev")).unwrap();
        assert_eq!(caller.user_id, "usr-1");
        assert_eq!(caller.name, "Demo User");
    }

    #[test]
    fn test_resolve_unknown_user_is_not_authenticated() {
        let store = Store::default();
        let err = CallerContext::resolve(&store, Some("ghost@nowhere.dev")).unwrap_err();
        assert!(matches!(err, TaskverseError::NotAuthenticated));
    }

    #[test]
    fn test_resolve_without_configured_user() {
        let store = Store::default();
        let err = CallerContext::resolve(&store, None).unwrap_err();
        assert!(matches!(err, TaskverseError::NotAuthenticated));
    }
}

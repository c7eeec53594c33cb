use crate::error::{Result, TaskverseError};
use crate::session::CallerContext;
use crate::store::Store;
use crate::types::{Membership, Organization};

/// Verify the caller is a member of the organization. Absence of a
/// membership record fails closed as NotAuthorized; there is no partial
/// trust.
pub fn authorize<'a>(
    store: &'a Store,
    caller: &CallerContext,
    organization_id: &str,
) -> Result<&'a Membership> {
    store
        .find_membership(&caller.user_id, organization_id)
        .ok_or(TaskverseError::NotAuthorized)
}

/// Second tier for administrative actions: membership alone is not enough.
pub fn require_admin(membership: &Membership) -> Result<()> {
    if membership.role.is_admin_tier() {
        Ok(())
    } else {
        Err(TaskverseError::Forbidden(format!(
            "requires Owner or Admin role, you are {}",
            membership.role
        )))
    }
}

/// The owner's own membership can never be role-changed or removed,
/// regardless of who asks.
pub fn ensure_not_owner(organization: &Organization, target_user_id: &str) -> Result<()> {
    if organization.owner_id == target_user_id {
        Err(TaskverseError::Forbidden(
            "the organization owner's membership cannot be changed or removed".into(),
        ))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use chrono::Utc;

    fn membership(role: Role) -> Membership {
        Membership {
            user_id: "usr-1".into(),
            organization_id: "org-1".into(),
            role,
            created_at: Utc::now(),
        }
    }

    fn caller(user_id: &str) -> CallerContext {
        CallerContext {
            user_id: user_id.into(),
            name: "Someone".into(),
            email: "someone@example.com".into(),
        }
    }

    fn store_with(m: Membership) -> Store {
        let mut store = Store::default();
        store.memberships.push(m);
        store
    }

    #[test]
    fn test_authorize_member() {
        let store = store_with(membership(Role::Member));
        let m = authorize(&store, &caller("usr-1"), "org-1").unwrap();
        assert_eq!(m.role, Role::Member);
    }

    #[test]
    fn test_authorize_non_member_fails_closed() {
        let store = store_with(membership(Role::Member));
        let err = authorize(&store, &caller("usr-2"), "org-1").unwrap_err();
        assert!(matches!(err, TaskverseError::NotAuthorized));
    }

    #[test]
    fn test_authorize_wrong_organization() {
        let store = store_with(membership(Role::Owner));
        let err = authorize(&store, &caller("usr-1"), "org-2").unwrap_err();
        assert!(matches!(err, TaskverseError::NotAuthorized));
    }

    #[test]
    fn test_require_admin_accepts_owner_and_admin() {
        assert!(require_admin(&membership(Role::Owner)).is_ok());
        assert!(require_admin(&membership(Role::Admin)).is_ok());
    }

    #[test]
    fn test_require_admin_rejects_member() {
        let err = require_admin(&membership(Role::Member)).unwrap_err();
        assert!(matches!(err, TaskverseError::Forbidden(_)));
    }

    #[test]
    fn test_owner_membership_is_protected() {
        let org = Organization {
            id: "org-1".into(),
            name: "Demo Org".into(),
            slug: "demo-org".into(),
            owner_id: "usr-1".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(
            ensure_not_owner(&org, "usr-1").unwrap_err(),
            TaskverseError::Forbidden(_)
        ));
        assert!(ensure_not_owner(&org, "usr-2").is_ok());
    }
}

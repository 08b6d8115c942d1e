//! API-side authorization guard.
//!
//! Checked at the route boundary, before any store is touched, so the stores
//! stay auth-agnostic.

use storefront_auth::{AuthzError, Permission, authorize};

use crate::context::PrincipalContext;

/// Check that the request's principal holds every permission in `required`.
pub fn authorize_request(
    principal: &PrincipalContext,
    required: &[Permission],
) -> Result<(), AuthzError> {
    let principal = principal.principal();
    for perm in required {
        authorize(&principal, perm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_auth::Role;
    use storefront_core::UserId;

    #[test]
    fn admin_holds_catalog_manage_and_customers_do_not() {
        let admin = PrincipalContext::new(UserId::new(), vec![Role::ADMIN]);
        let customer = PrincipalContext::new(UserId::new(), vec![]);

        assert!(authorize_request(&admin, &[Permission::CATALOG_MANAGE]).is_ok());
        assert!(authorize_request(&customer, &[Permission::DOWNLOADS_READ]).is_ok());
        assert_eq!(
            authorize_request(&customer, &[Permission::CATALOG_MANAGE]),
            Err(AuthzError::Forbidden("catalog.manage".to_string()))
        );
    }
}

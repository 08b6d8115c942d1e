//! `storefront-auth`: bearer-token verification and role-based authorization.
//!
//! This crate is intentionally decoupled from HTTP and storage. Tokens are
//! issued by the external auth provider; this crate only verifies them and
//! decides what the bearer may do.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod roles;

pub use authorize::{AuthzError, Principal, authorize, permissions_from_roles};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{AuthError, Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use roles::Role;

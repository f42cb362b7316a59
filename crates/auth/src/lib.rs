//! `consolekit-auth` — session claims and role-based menu assignment.
//!
//! This crate is intentionally decoupled from HTTP and token cryptography:
//! tokens are produced and verified by a [`Signer`] supplied by the caller.

pub mod claims;
pub mod roles;

pub use claims::{SessionClaims, Signer, TokenValidationError, validate_claims};
pub use roles::{Role, RoleChanges, RoleDirectory, RoleDraft, RoleQuery};

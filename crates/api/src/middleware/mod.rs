//! Authentication and authorization middleware extractors.
//!
//! - [`auth::AuthUser`] -- Extracts the authenticated user from a JWT Bearer token.
//! - [`rbac`] -- One extractor per `achievement:*` permission.
//!
//! These only gate on the caller's role. Whether the caller may touch a
//! particular achievement is decided by the core's authorization guard.

pub mod auth;
pub mod rbac;

//! Authentication primitives.
//!
//! Credentials are issued by the external identity service; this server only
//! validates the HS256 access tokens it receives.

pub mod jwt;

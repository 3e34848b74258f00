//! HTTP route handlers outside the auth module.
//!
//! Session and authentication routes live in `crate::auth::routes`; this
//! module holds the remaining service endpoints.

pub mod health;

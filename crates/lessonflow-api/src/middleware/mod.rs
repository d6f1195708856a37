//! API Middleware

pub mod auth;

pub use auth::{require_auth, role_from_db, role_to_db, AuthState, AuthUser};

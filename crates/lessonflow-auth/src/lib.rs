//! Authentication for the lessonflow administrative API
//!
//! A bearer token identifies a user and carries their role. Nothing more is
//! assumed about the protocol.

pub mod jwt;
pub mod password;
pub mod role;

pub use jwt::{JwtClaims, JwtError, JwtValidator};
pub use password::{hash_password, validate_password_strength, verify_password, PasswordError};
pub use role::{Role, UnknownRole};

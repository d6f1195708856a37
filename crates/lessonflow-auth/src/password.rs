//! Password hashing for staff accounts (Argon2id, PHC strings)

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use thiserror::Error;

/// Shortest password accepted at registration or account creation
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    /// Stored hash is not a PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHashFormat(String),

    #[error("Password must be at least {MIN_PASSWORD_LEN} characters")]
    TooShort,
}

/// Hash a password with Argon2id and a fresh random salt
///
/// The result is a self-describing PHC string (`$argon2id$v=19$...`) that is
/// stored as-is in `users.password_hash`.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Check a login attempt against a stored hash
///
/// A wrong password is `Ok(false)`; only a corrupt hash is an error.
pub fn verify_password(password: &str, stored_hash: &str) -> Result<bool, PasswordError> {
    let parsed =
        PasswordHash::new(stored_hash).map_err(|e| PasswordError::InvalidHashFormat(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

/// Reject passwords shorter than [`MIN_PASSWORD_LEN`] characters
pub fn validate_password_strength(password: &str) -> Result<(), PasswordError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(PasswordError::TooShort);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_argon2id_phc_string() {
        let hash = hash_password("editor-password").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(hash.contains("v=19"));
    }

    #[test]
    fn test_verify_accepts_matching_password_only() {
        let hash = hash_password("admin-password").unwrap();

        assert!(verify_password("admin-password", &hash).unwrap());
        assert!(!verify_password("Admin-password", &hash).unwrap());
        assert!(!verify_password("", &hash).unwrap());
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("viewer-password").unwrap();
        let second = hash_password("viewer-password").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_corrupt_hash_is_an_error() {
        let result = verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat(_))));
    }

    #[test]
    fn test_password_strength() {
        assert!(matches!(
            validate_password_strength("short"),
            Err(PasswordError::TooShort)
        ));
        assert!(validate_password_strength("long enough").is_ok());
        // Counted in characters, not bytes
        assert!(validate_password_strength("日本語日本語日").is_err());
    }
}

//! Session tokens (HS256 JWT)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::role::Role;

/// Issuer written into every session token
pub const ISSUER: &str = "lessonflow";

/// Claims of a session token
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JwtClaims {
    /// Subject: the user id
    pub sub: String,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration (unix seconds)
    pub exp: i64,
    pub iss: String,
    pub email: String,
    pub role: Role,
}

impl JwtClaims {
    pub fn new(user_id: Uuid, email: String, role: Role, validity: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id.to_string(),
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
            iss: ISSUER.to_string(),
            email,
            role,
        }
    }

    pub fn user_id(&self) -> Result<Uuid, JwtError> {
        Uuid::parse_str(&self.sub).map_err(|_| JwtError::InvalidSubject(self.sub.clone()))
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(self.exp, 0).unwrap_or_else(Utc::now)
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }
}

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token subject '{0}' is not a user id")]
    InvalidSubject(String),
}

/// Verifies session tokens signed with the shared secret
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    /// Validates signature, expiration and issuer
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_aud = false;
        validation.leeway = 0;
        validation.set_issuer(&[ISSUER]);

        Self {
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<JwtClaims, JwtError> {
        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &self.validation)?;

        if token_data.claims.is_expired() {
            return Err(JwtError::TokenExpired);
        }

        Ok(token_data.claims)
    }

    pub fn encode(secret: &[u8], claims: &JwtClaims) -> Result<String, JwtError> {
        let header = Header::new(Algorithm::HS256);
        let encoding_key = EncodingKey::from_secret(secret);

        Ok(encode(&header, claims, &encoding_key)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_SECRET: &[u8] = b"test_secret_key_1234567890";

    fn claims(validity: Duration) -> JwtClaims {
        JwtClaims::new(
            Uuid::new_v4(),
            "editor@example.com".to_string(),
            Role::Editor,
            validity,
        )
    }

    #[test]
    fn test_encode_then_validate() {
        let original = claims(Duration::minutes(30));
        let token = JwtValidator::encode(TEST_SECRET, &original).unwrap();

        let decoded = JwtValidator::new(TEST_SECRET).validate(&token).unwrap();

        assert_eq!(decoded, original);
        assert_eq!(decoded.role, Role::Editor);
        assert!(decoded.user_id().is_ok());
    }

    #[test]
    fn test_expired_token_rejected() {
        let expired = claims(Duration::seconds(-10));
        assert!(expired.is_expired());

        let token = JwtValidator::encode(TEST_SECRET, &expired).unwrap();
        assert!(JwtValidator::new(TEST_SECRET).validate(&token).is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = JwtValidator::encode(b"other-secret", &claims(Duration::minutes(5))).unwrap();
        assert!(JwtValidator::new(TEST_SECRET).validate(&token).is_err());
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let mut foreign = claims(Duration::minutes(5));
        foreign.iss = "someone-else".to_string();

        let token = JwtValidator::encode(TEST_SECRET, &foreign).unwrap();
        assert!(JwtValidator::new(TEST_SECRET).validate(&token).is_err());
    }

    #[test]
    fn test_non_uuid_subject() {
        let mut bad = claims(Duration::minutes(5));
        bad.sub = "not-a-uuid".to_string();
        assert!(matches!(bad.user_id(), Err(JwtError::InvalidSubject(_))));
    }
}

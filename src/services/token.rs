//! Token issuance and verification.
//!
//! Sessions are represented by signed, time-bound JWTs. Issuing and verifying
//! are pure functions of (token, secret, clock); nothing is stored server-side,
//! which also means tokens cannot be revoked before their natural expiry. That
//! limitation is deliberate and documented: `logout` is a client-side discard
//! plus an audit entry.

use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, models::user::User};

/// Claims embedded in every session token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id
    pub sub: Uuid,

    pub email: String,
    pub full_name: Option<String>,

    /// Issuer, checked on verification
    pub iss: String,

    /// Audience, checked on verification
    pub aud: String,

    /// Issued-at, unix seconds
    pub iat: i64,

    /// Expiry, unix seconds
    pub exp: i64,
}

/// Why a token was rejected.
///
/// Expiry is separated from every other failure so callers can tell the user
/// "please log in again" instead of "token rejected".
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,

    #[error("token is invalid")]
    Invalid,
}

/// Issues and verifies session tokens.
///
/// Built once at startup from the configured secret and shared through
/// application state.
#[derive(Clone)]
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    issuer: String,
    audience: String,
    expiry_hours: i64,
}

impl TokenService {
    pub fn new(config: &Config) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            issuer: config.jwt_issuer.clone(),
            audience: config.jwt_audience.clone(),
            expiry_hours: config.jwt_expiry_hours,
        }
    }

    /// Issue a signed token for an authenticated user.
    pub fn issue(&self, user: &User) -> Result<String, jsonwebtoken::errors::Error> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.expiry_hours)).timestamp(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify a token's signature, issuer, audience, and expiry.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> Config {
        // envy is bypassed in tests; construct the struct directly.
        Config {
            database_url: "postgres://unused".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_expiry_hours: 24,
            jwt_issuer: "sensor-data-api".to_string(),
            jwt_audience: "sensor-data-clients".to_string(),
            bcrypt_cost: 4,
            api_key_prefix: "s2s_".to_string(),
            api_key_length: 32,
            public_rate_limit_per_hour: 100,
            public_rate_limit_per_day: 500,
            auth_rate_limit_per_hour: 1000,
            auth_rate_limit_per_day: 10000,
            password_min_length: 8,
            max_page_size: 10000,
            cleanup_interval_secs: 600,
        }
    }

    fn test_user() -> User {
        User {
            id: Uuid::new_v4(),
            email: "a@b.com".to_string(),
            password_hash: "unused".to_string(),
            full_name: Some("Test User".to_string()),
            organization: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn issue_then_verify_roundtrip() {
        let service = TokenService::new(&test_config());
        let user = test_user();

        let token = service.issue(&user).unwrap();
        let claims = service.verify(&token).unwrap();

        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, user.email);
        assert_eq!(claims.full_name, user.full_name);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_distinguished() {
        let config = test_config();
        let service = TokenService::new(&config);
        let user = test_user();

        // Encode a token whose expiry is well past the verifier's leeway.
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            full_name: None,
            iss: config.jwt_issuer.clone(),
            aud: config.jwt_audience.clone(),
            iat: (now - Duration::hours(2)).timestamp(),
            exp: (now - Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn wrong_audience_is_invalid_not_expired() {
        let config = test_config();
        let service = TokenService::new(&config);
        let user = test_user();

        let mut other = test_config();
        other.jwt_audience = "someone-else".to_string();
        let token = TokenService::new(&other).issue(&user).unwrap();

        assert_eq!(service.verify(&token), Err(TokenError::Invalid));
    }

    #[test]
    fn garbage_token_is_invalid() {
        let service = TokenService::new(&test_config());
        assert_eq!(service.verify("not.a.jwt"), Err(TokenError::Invalid));
        assert_eq!(service.verify(""), Err(TokenError::Invalid));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let user = test_user();
        let token = TokenService::new(&config).issue(&user).unwrap();

        let mut other = config;
        other.jwt_secret = "different-secret".to_string();
        assert_eq!(
            TokenService::new(&other).verify(&token),
            Err(TokenError::Invalid)
        );
    }
}

//! User account models and API request/response types.
//!
//! This module defines:
//! - `User`: Database entity representing an account holder
//! - Signup/login/profile request bodies
//! - `UserResponse`: the user shape returned to clients (never the hash)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a user record from the database.
///
/// # Database Table
///
/// Maps to the `users` table. Emails are stored lowercased and are unique
/// case-insensitively. Users are never deleted; `is_active = false` deactivates
/// the account while preserving its keys and history.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique identifier for this user
    pub id: Uuid,

    /// Email address, lowercased at rest
    pub email: String,

    /// bcrypt hash of the password; the plaintext is never stored
    pub password_hash: String,

    /// Optional display name
    pub full_name: Option<String>,

    /// Optional organization the user belongs to
    pub organization: Option<String>,

    /// Whether this account may log in and use its API keys
    pub is_active: bool,

    /// Timestamp when the account was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last profile change
    pub updated_at: DateTime<Utc>,
}

/// Request body for `POST /api/v1/auth/signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Request body for `PUT /api/v1/auth/profile`.
///
/// Only the supplied fields are changed.
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub full_name: Option<String>,
    pub organization: Option<String>,
}

impl UpdateProfileRequest {
    /// True when the request carries nothing to change.
    pub fn is_empty(&self) -> bool {
        self.full_name.is_none() && self.organization.is_none()
    }
}

/// User shape returned to API clients.
///
/// The password hash is stripped; everything else is safe to show the owner.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub organization: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            organization: user.organization,
            created_at: user.created_at,
        }
    }
}

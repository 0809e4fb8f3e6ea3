//! API key models and API request/response types.
//!
//! API keys are long-lived programmatic credentials. The full secret is stored
//! only as a bcrypt hash; the first 12 characters of the plaintext are kept in
//! clear as `key_prefix` so a presented key can be resolved with a single
//! index lookup instead of comparing hashes against every stored key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of plaintext characters stored in clear as the lookup prefix.
pub const KEY_PREFIX_LEN: usize = 12;

/// Hard cap on keys per user, counting revoked keys.
pub const MAX_KEYS_PER_USER: i64 = 10;

/// Databases a fresh key may read from.
const DEFAULT_DATABASES: &[&str] = &["sensor_readings"];

/// Represents an API key record from the database.
///
/// # Database Table
///
/// Maps to the `api_keys` table. The plaintext key is returned to the caller
/// exactly once at creation and is never stored or retrievable afterwards.
/// Deletion is always a soft revoke (`is_active = false`) so historical usage
/// events stay attributable.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApiKey {
    /// Unique identifier for this API key
    pub id: Uuid,

    /// User who owns this key
    pub user_id: Uuid,

    /// bcrypt hash of the full plaintext key
    pub key_hash: String,

    /// First 12 characters of the plaintext key, unique across all keys
    pub key_prefix: String,

    /// Human-readable name chosen by the owner
    pub name: String,

    /// Optional free-form description
    pub description: Option<String>,

    /// Capability set as stored JSON; see [`ApiKeyPermissions`]
    pub permissions: serde_json::Value,

    /// Hourly quota; `None` falls back to the configured default
    pub rate_limit_per_hour: Option<i32>,

    /// Daily quota; `None` falls back to the configured default
    pub rate_limit_per_day: Option<i32>,

    /// Whether this key is accepted during authentication
    pub is_active: bool,

    /// Lifetime request counter, incremented by the usage logger
    pub total_requests: i64,

    /// Timestamp when the key was created
    pub created_at: DateTime<Utc>,

    /// Timestamp of the most recent successful authentication
    pub last_used_at: Option<DateTime<Utc>>,

    /// Optional hard expiry; keys past this instant are rejected even if active
    pub expires_at: Option<DateTime<Utc>>,
}

/// Structured capability set attached to every key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyPermissions {
    /// Database names the key may query
    pub databases: Vec<String>,

    /// Allowed operations, e.g. `"read"`
    pub operations: Vec<String>,
}

impl Default for ApiKeyPermissions {
    /// Read-only access over the fixed database list.
    fn default() -> Self {
        Self {
            databases: DEFAULT_DATABASES.iter().map(|d| d.to_string()).collect(),
            operations: vec!["read".to_string()],
        }
    }
}

/// Request body for `POST /api/v1/api-keys`.
#[derive(Debug, Deserialize)]
pub struct CreateApiKeyRequest {
    pub name: String,
    pub description: Option<String>,
    pub rate_limit_per_hour: Option<i32>,

    /// When set, the key expires this many days from creation
    pub expires_in_days: Option<i64>,
}

/// Request body for `PUT /api/v1/api-keys/{key_id}`.
///
/// Only the supplied fields are changed.
#[derive(Debug, Deserialize)]
pub struct UpdateApiKeyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
    pub rate_limit_per_hour: Option<i32>,
}

impl UpdateApiKeyRequest {
    /// True when the request carries nothing to change.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.is_active.is_none()
            && self.rate_limit_per_hour.is_none()
    }
}

/// API key shape returned to clients after creation.
///
/// This is the only response that ever contains the plaintext key.
#[derive(Debug, Serialize)]
pub struct CreatedApiKeyResponse {
    pub id: Uuid,

    /// Full plaintext key; shown exactly once, never retrievable again
    pub api_key: String,

    pub key_prefix: String,
    pub name: String,
    pub expires_at: Option<DateTime<Utc>>,
}

/// API key metadata returned by list/get endpoints.
///
/// Never includes the hash or the plaintext; only `key_prefix` identifies the
/// credential to its owner.
#[derive(Debug, Serialize)]
pub struct ApiKeyResponse {
    pub id: Uuid,
    pub key_prefix: String,
    pub name: String,
    pub description: Option<String>,
    pub permissions: ApiKeyPermissions,
    pub rate_limit_per_hour: Option<i32>,
    pub rate_limit_per_day: Option<i32>,
    pub is_active: bool,
    pub total_requests: i64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<ApiKey> for ApiKeyResponse {
    fn from(key: ApiKey) -> Self {
        // Stored permissions were serialized from ApiKeyPermissions; a row
        // predating the current shape falls back to the read-only default.
        let permissions = serde_json::from_value(key.permissions).unwrap_or_default();
        Self {
            id: key.id,
            key_prefix: key.key_prefix,
            name: key.name,
            description: key.description,
            permissions,
            rate_limit_per_hour: key.rate_limit_per_hour,
            rate_limit_per_day: key.rate_limit_per_day,
            is_active: key.is_active,
            total_requests: key.total_requests,
            created_at: key.created_at,
            last_used_at: key.last_used_at,
            expires_at: key.expires_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_permissions_are_read_only() {
        let perms = ApiKeyPermissions::default();
        assert_eq!(perms.operations, vec!["read"]);
        assert!(!perms.databases.is_empty());
    }

    #[test]
    fn update_request_emptiness() {
        let empty = UpdateApiKeyRequest {
            name: None,
            description: None,
            is_active: None,
            rate_limit_per_hour: None,
        };
        assert!(empty.is_empty());

        let partial = UpdateApiKeyRequest {
            name: None,
            description: None,
            is_active: Some(false),
            rate_limit_per_hour: None,
        };
        assert!(!partial.is_empty());
    }

    #[test]
    fn response_parses_stored_permissions() {
        let key = ApiKey {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            key_hash: "$2b$04$x".to_string(),
            key_prefix: "s2s_abcdefgh".to_string(),
            name: "test".to_string(),
            description: None,
            permissions: serde_json::json!({
                "databases": ["sensor_readings"],
                "operations": ["read"]
            }),
            rate_limit_per_hour: Some(1000),
            rate_limit_per_day: Some(10000),
            is_active: true,
            total_requests: 0,
            created_at: Utc::now(),
            last_used_at: None,
            expires_at: None,
        };

        let response = ApiKeyResponse::from(key);
        assert_eq!(response.permissions.databases, vec!["sensor_readings"]);
        assert_eq!(response.key_prefix.len(), KEY_PREFIX_LEN);
    }
}

//! API key lifecycle service.
//!
//! Handles key generation, creation, listing, partial updates, soft revocation,
//! and usage aggregation. Every query filters by the owning `user_id`, so a
//! caller can never see or mutate another user's keys.

use chrono::{Duration, Utc};
use rand::{Rng, distr::Alphanumeric};
use uuid::Uuid;

use crate::{
    config::Config,
    db::DbPool,
    error::AppError,
    models::{
        api_key::{
            ApiKey, ApiKeyPermissions, ApiKeyResponse, CreateApiKeyRequest, CreatedApiKeyResponse,
            KEY_PREFIX_LEN, MAX_KEYS_PER_USER, UpdateApiKeyRequest,
        },
        audit::AuditAction,
        usage::{DailyUsage, EndpointUsage, StatusUsage, UsageResponse},
    },
    services::{audit, password},
};

/// Generate a fresh plaintext key: configured prefix + random alphanumerics.
pub fn generate_key(prefix: &str, length: usize) -> String {
    let random: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect();
    format!("{prefix}{random}")
}

/// First 12 characters of a plaintext key, the clear-text lookup index.
///
/// Returns `None` when the presented string is shorter than the prefix, which
/// cannot match any stored key.
pub fn key_prefix(key: &str) -> Option<&str> {
    key.get(..KEY_PREFIX_LEN)
}

/// Guarded insert for key creation. The per-user cap is evaluated inside the
/// same statement as the INSERT, so two concurrent creates cannot both pass
/// on a stale count; the loser inserts zero rows.
const CREATE_KEY_SQL: &str = r#"
    INSERT INTO api_keys (
        user_id, key_hash, key_prefix, name, description,
        permissions, rate_limit_per_hour, rate_limit_per_day, expires_at
    )
    SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9
    WHERE (SELECT COUNT(*) FROM api_keys WHERE user_id = $1) < $10
    RETURNING *
"#;

/// Create a new API key for `user_id`.
///
/// # Process
///
/// 1. Validate the name
/// 2. Generate the plaintext secret and bcrypt-hash it
/// 3. Store hash + 12-char prefix + default read-only permissions, with the
///    per-user key cap enforced atomically by the insert itself (revoked
///    keys count against the cap)
/// 4. Audit `API_KEY_CREATED`
///
/// The returned response is the only place the plaintext ever appears.
pub async fn create_api_key(
    pool: &DbPool,
    config: &Config,
    user_id: Uuid,
    request: CreateApiKeyRequest,
    ip: Option<String>,
) -> Result<CreatedApiKeyResponse, AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("Key name must not be empty".into()));
    }

    let plaintext = generate_key(&config.api_key_prefix, config.api_key_length);
    // Generated keys are always long enough; the expect cannot fire.
    let prefix = key_prefix(&plaintext).expect("generated key shorter than prefix");

    // bcrypt is deliberately slow; keep it off the async executor.
    let cost = config.bcrypt_cost;
    let secret = plaintext.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash_secret(&secret, cost))
        .await
        .map_err(|e| AppError::AuthInternal(format!("hashing task: {e}")))??;

    let permissions = serde_json::to_value(ApiKeyPermissions::default())
        .map_err(|e| AppError::AuthInternal(format!("serializing permissions: {e}")))?;

    let rate_limit_per_hour = request
        .rate_limit_per_hour
        .unwrap_or(config.auth_rate_limit_per_hour);
    let expires_at = request
        .expires_in_days
        .map(|days| Utc::now() + Duration::days(days));

    let key = sqlx::query_as::<_, ApiKey>(CREATE_KEY_SQL)
        .bind(user_id)
        .bind(&hash)
        .bind(prefix)
        .bind(request.name.trim())
        .bind(&request.description)
        .bind(&permissions)
        .bind(rate_limit_per_hour)
        .bind(config.auth_rate_limit_per_day)
        .bind(expires_at)
        .bind(MAX_KEYS_PER_USER)
        .fetch_optional(pool)
        .await?
        .ok_or(AppError::KeyLimitReached)?;

    audit::record(
        pool,
        Some(user_id),
        AuditAction::ApiKeyCreated,
        serde_json::json!({ "key_id": key.id, "name": key.name }),
        ip,
    )
    .await;

    Ok(CreatedApiKeyResponse {
        id: key.id,
        api_key: plaintext,
        key_prefix: key.key_prefix,
        name: key.name,
        expires_at: key.expires_at,
    })
}

/// List the caller's keys, newest first. Hashes and plaintext never leave the
/// database layer.
pub async fn list_api_keys(pool: &DbPool, user_id: Uuid) -> Result<Vec<ApiKeyResponse>, AppError> {
    let keys = sqlx::query_as::<_, ApiKey>(
        "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(keys.into_iter().map(Into::into).collect())
}

/// Fetch one caller-owned key with parsed permissions.
pub async fn get_api_key(
    pool: &DbPool,
    user_id: Uuid,
    key_id: Uuid,
) -> Result<ApiKeyResponse, AppError> {
    let key =
        sqlx::query_as::<_, ApiKey>("SELECT * FROM api_keys WHERE id = $1 AND user_id = $2")
            .bind(key_id)
            .bind(user_id)
            .fetch_optional(pool)
            .await?
            .ok_or(AppError::KeyNotFound)?;

    Ok(key.into())
}

/// Apply a partial update to a caller-owned key.
///
/// Only supplied fields change; COALESCE keeps the stored value for every
/// field the request omits. An empty request is rejected before touching the
/// database.
pub async fn update_api_key(
    pool: &DbPool,
    user_id: Uuid,
    key_id: Uuid,
    request: UpdateApiKeyRequest,
    ip: Option<String>,
) -> Result<ApiKeyResponse, AppError> {
    if request.is_empty() {
        return Err(AppError::NoUpdates);
    }

    let key = sqlx::query_as::<_, ApiKey>(
        r#"
        UPDATE api_keys
        SET name = COALESCE($1, name),
            description = COALESCE($2, description),
            is_active = COALESCE($3, is_active),
            rate_limit_per_hour = COALESCE($4, rate_limit_per_hour)
        WHERE id = $5 AND user_id = $6
        RETURNING *
        "#,
    )
    .bind(&request.name)
    .bind(&request.description)
    .bind(request.is_active)
    .bind(request.rate_limit_per_hour)
    .bind(key_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::KeyNotFound)?;

    audit::record(
        pool,
        Some(user_id),
        AuditAction::ApiKeyUpdated,
        serde_json::json!({
            "key_id": key_id,
            "updated_name": request.name.is_some(),
            "updated_description": request.description.is_some(),
            "updated_is_active": request.is_active,
            "updated_rate_limit_per_hour": request.rate_limit_per_hour,
        }),
        ip,
    )
    .await;

    Ok(key.into())
}

/// Revoke a caller-owned key (soft delete).
///
/// Sets `is_active = false`; the row and its usage history remain. The
/// authentication middleware excludes inactive keys from lookup, so revocation
/// takes effect on the next request.
pub async fn revoke_api_key(
    pool: &DbPool,
    user_id: Uuid,
    key_id: Uuid,
    ip: Option<String>,
) -> Result<(), AppError> {
    let name: String = sqlx::query_scalar(
        r#"
        UPDATE api_keys
        SET is_active = false
        WHERE id = $1 AND user_id = $2
        RETURNING name
        "#,
    )
    .bind(key_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::KeyNotFound)?;

    audit::record(
        pool,
        Some(user_id),
        AuditAction::ApiKeyRevoked,
        serde_json::json!({ "key_id": key_id, "name": name }),
        ip,
    )
    .await;

    Ok(())
}

/// Aggregate usage events for a caller-owned key over a trailing window.
///
/// Three views: count + average latency per endpoint (top 10 by count), count
/// per calendar day, count per status code.
pub async fn usage_stats(
    pool: &DbPool,
    user_id: Uuid,
    key_id: Uuid,
    days: i32,
) -> Result<UsageResponse, AppError> {
    // Ownership check before touching the usage table.
    let owned: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM api_keys WHERE id = $1 AND user_id = $2)")
            .bind(key_id)
            .bind(user_id)
            .fetch_one(pool)
            .await?;

    if !owned {
        return Err(AppError::KeyNotFound);
    }

    let by_endpoint = sqlx::query_as::<_, EndpointUsage>(
        r#"
        SELECT endpoint,
               COUNT(*) AS request_count,
               AVG(response_time_ms)::float8 AS avg_response_ms
        FROM api_key_usage
        WHERE api_key_id = $1 AND created_at > NOW() - make_interval(days => $2)
        GROUP BY endpoint
        ORDER BY request_count DESC
        LIMIT 10
        "#,
    )
    .bind(key_id)
    .bind(days)
    .fetch_all(pool)
    .await?;

    let by_day = sqlx::query_as::<_, DailyUsage>(
        r#"
        SELECT (created_at AT TIME ZONE 'UTC')::date AS day,
               COUNT(*) AS request_count
        FROM api_key_usage
        WHERE api_key_id = $1 AND created_at > NOW() - make_interval(days => $2)
        GROUP BY day
        ORDER BY day
        "#,
    )
    .bind(key_id)
    .bind(days)
    .fetch_all(pool)
    .await?;

    let by_status = sqlx::query_as::<_, StatusUsage>(
        r#"
        SELECT status_code,
               COUNT(*) AS request_count
        FROM api_key_usage
        WHERE api_key_id = $1 AND created_at > NOW() - make_interval(days => $2)
        GROUP BY status_code
        ORDER BY status_code
        "#,
    )
    .bind(key_id)
    .bind(days)
    .fetch_all(pool)
    .await?;

    Ok(UsageResponse {
        days,
        by_endpoint,
        by_day,
        by_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_has_prefix_and_length() {
        let key = generate_key("s2s_", 32);
        assert!(key.starts_with("s2s_"));
        assert_eq!(key.len(), "s2s_".len() + 32);
        assert!(key["s2s_".len()..].chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn generated_keys_are_unique() {
        let a = generate_key("s2s_", 32);
        let b = generate_key("s2s_", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn prefix_is_first_twelve_chars() {
        let key = generate_key("s2s_", 32);
        let prefix = key_prefix(&key).unwrap();
        assert_eq!(prefix.len(), KEY_PREFIX_LEN);
        assert_eq!(prefix, &key[..12]);
    }

    #[test]
    fn short_input_has_no_prefix() {
        assert_eq!(key_prefix("s2s_short"), None);
        assert_eq!(key_prefix(""), None);
    }

    #[test]
    fn key_cap_is_enforced_inside_the_insert() {
        // The cap guard must stay in the INSERT statement itself. A separate
        // count-then-insert lets two concurrent creates both observe 9 keys
        // and leave the user with 11.
        assert!(
            CREATE_KEY_SQL
                .contains("WHERE (SELECT COUNT(*) FROM api_keys WHERE user_id = $1) < $10")
        );
        assert!(CREATE_KEY_SQL.contains("RETURNING *"));
    }
}

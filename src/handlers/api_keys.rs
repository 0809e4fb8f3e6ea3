//! API key lifecycle HTTP handlers.
//!
//! This module implements the key management endpoints:
//! - POST /api/v1/api-keys - Create a key (plaintext returned exactly once)
//! - GET /api/v1/api-keys - List the caller's keys
//! - GET /api/v1/api-keys/{key_id} - Fetch one key's metadata
//! - PUT /api/v1/api-keys/{key_id} - Partial update
//! - DELETE /api/v1/api-keys/{key_id} - Soft revoke
//! - GET /api/v1/api-keys/{key_id}/usage - Aggregated usage
//!
//! All endpoints require a session; ownership is enforced by filtering every
//! query on the caller's user id, so a foreign key id simply looks absent.

use axum::{
    Extension, Json,
    extract::{ConnectInfo, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde_json::json;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{auth::SessionContext, client_ip},
    models::{
        api_key::{CreateApiKeyRequest, UpdateApiKeyRequest},
        usage::UsageQuery,
    },
    services::api_key,
    state::AppState,
};

/// Default trailing window for usage aggregation, in days.
const DEFAULT_USAGE_DAYS: i32 = 7;

/// Create a new API key.
///
/// # Response
///
/// Returns 201 Created. The `api_key` field holds the plaintext secret and is
/// the only time it is ever transmitted; afterwards only `key_prefix` is
/// visible.
///
/// ```json
/// {
///   "success": true,
///   "key": {
///     "id": "550e8400-e29b-41d4-a716-446655440000",
///     "api_key": "s2s_AbCd...32 random characters",
///     "key_prefix": "s2s_AbCdEfGh",
///     "name": "my pipeline",
///     "expires_at": null
///   }
/// }
/// ```
///
/// # Errors
///
/// - **400 `KEY_LIMIT_REACHED`**: the caller already holds 10 keys
/// - **400 `VALIDATION_ERROR`**: empty name
pub async fn create_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<CreateApiKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let created = api_key::create_api_key(
        &state.pool,
        &state.config,
        session.user_id,
        request,
        Some(client_ip(&headers, Some(remote))),
    )
    .await?;

    // Flatten into the envelope so `api_key` sits at the top level; this is
    // the only response that ever carries the plaintext.
    let mut body = serde_json::to_value(&created)
        .map_err(|e| AppError::AuthInternal(format!("serializing response: {e}")))?;
    body["success"] = serde_json::Value::Bool(true);

    Ok((StatusCode::CREATED, Json(body)))
}

/// List the caller's keys, newest first. Secrets and hashes are never
/// included.
pub async fn list_keys(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<serde_json::Value>, AppError> {
    let keys = api_key::list_api_keys(&state.pool, session.user_id).await?;

    Ok(Json(json!({ "success": true, "keys": keys })))
}

/// Fetch one key's metadata, including its parsed permissions.
///
/// Returns 404 `KEY_NOT_FOUND` when the key does not exist or belongs to a
/// different user.
pub async fn get_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(key_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key = api_key::get_api_key(&state.pool, session.user_id, key_id).await?;

    Ok(Json(json!({ "success": true, "key": key })))
}

/// Partially update a key.
///
/// Any of `name`, `description`, `is_active`, `rate_limit_per_hour` may be
/// supplied; a body with none of them is rejected with 400 `NO_UPDATES`.
pub async fn update_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(key_id): Path<Uuid>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<UpdateApiKeyRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let key = api_key::update_api_key(
        &state.pool,
        session.user_id,
        key_id,
        request,
        Some(client_ip(&headers, Some(remote))),
    )
    .await?;

    Ok(Json(json!({ "success": true, "key": key })))
}

/// Revoke a key (soft delete).
///
/// Sets `is_active = false` and keeps the row so historical usage stays
/// attributable. The key stops authenticating on the next request.
pub async fn revoke_key(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(key_id): Path<Uuid>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    api_key::revoke_api_key(
        &state.pool,
        session.user_id,
        key_id,
        Some(client_ip(&headers, Some(remote))),
    )
    .await?;

    Ok(Json(json!({
        "success": true,
        "message": "API key revoked",
    })))
}

/// Aggregated usage for a caller-owned key.
///
/// `GET /api/v1/api-keys/{key_id}/usage?days=N` (default 7, clamped to
/// 1..=365) returns counts and average latency by endpoint, by day, and by
/// status code.
pub async fn key_usage(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    Path(key_id): Path<Uuid>,
    Query(query): Query<UsageQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_USAGE_DAYS).clamp(1, 365);
    let usage = api_key::usage_stats(&state.pool, session.user_id, key_id, days).await?;

    Ok(Json(json!({ "success": true, "usage": usage })))
}

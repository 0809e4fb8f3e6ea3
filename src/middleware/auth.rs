//! Authentication middleware.
//!
//! Three independent gates, composed per route group:
//!
//! - `require_session`: rejects requests without a valid bearer token
//! - `optional_session`: attaches a session when present, never rejects
//! - `resolve_api_key`: resolves an `X-API-Key` credential into an identity,
//!   leaving keyless requests as public traffic
//!
//! Each gate inserts its resolved context into the request's extension map so
//! downstream middleware and handlers see a normalized identity instead of raw
//! headers.

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::api_key::ApiKeyPermissions,
    services::{api_key, password, token::TokenError},
    state::AppState,
};

/// Identity of a logged-in user, resolved from a verified bearer token.
///
/// Inserted into request extensions by `require_session` / `optional_session`
/// and extracted by handlers via `Extension<SessionContext>`.
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
}

/// Identity of a programmatic caller, resolved from a verified API key.
#[derive(Debug, Clone)]
pub struct ApiKeyContext {
    pub key_id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub key_name: String,
    pub permissions: ApiKeyPermissions,

    /// Hourly quota; `None` means the configured authenticated default
    pub rate_limit_per_hour: Option<i32>,
    pub rate_limit_per_day: Option<i32>,
}

/// Normalized identity attached to every request on the data pipeline.
///
/// The rate limiter keys its counters off this, and the usage logger records
/// events only for the `ApiKey` variant.
#[derive(Debug, Clone)]
pub enum RequestIdentity {
    /// No API key presented; quota is tracked per client IP
    Public,

    /// Authenticated programmatic access
    ApiKey(ApiKeyContext),
}

/// Extract the token from an `Authorization` header value.
///
/// The header must be exactly two space-separated parts with the literal
/// scheme `Bearer`; anything else is malformed.
fn bearer_token(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Require a valid session token.
///
/// # Failure modes
///
/// - No `Authorization` header -> 401 `UNAUTHORIZED`
/// - Header not `Bearer <token>` -> 401 `INVALID_TOKEN_FORMAT`
/// - Expired token -> 401 `TOKEN_EXPIRED`
/// - Any other verification failure -> 401 `INVALID_TOKEN`
///
/// On success, inserts [`SessionContext`] and calls the next handler.
pub async fn require_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::MissingToken)?;

    let token = bearer_token(header).ok_or(AppError::InvalidTokenFormat)?;

    let claims = state.tokens.verify(token).map_err(|e| match e {
        TokenError::Expired => AppError::TokenExpired,
        TokenError::Invalid => AppError::InvalidToken,
    })?;

    request.extensions_mut().insert(SessionContext {
        user_id: claims.sub,
        email: claims.email,
        full_name: claims.full_name,
    });

    Ok(next.run(request).await)
}

/// Attach a session when a valid token is present; never reject.
///
/// Used on endpoints that personalize behavior for logged-in users while
/// remaining usable anonymously. Parsing and verification failures simply
/// leave the request without a session.
pub async fn optional_session(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token);

    if let Some(token) = token {
        if let Ok(claims) = state.tokens.verify(token) {
            request.extensions_mut().insert(SessionContext {
                user_id: claims.sub,
                email: claims.email,
                full_name: claims.full_name,
            });
        }
    }

    next.run(request).await
}

/// Row fetched when resolving a presented API key.
///
/// Joined to the owning user so the key's status and the account's status are
/// checked in one round trip.
#[derive(Debug, sqlx::FromRow)]
struct KeyAuthRow {
    id: Uuid,
    user_id: Uuid,
    key_hash: String,
    name: String,
    permissions: serde_json::Value,
    rate_limit_per_hour: Option<i32>,
    rate_limit_per_day: Option<i32>,
    expires_at: Option<DateTime<Utc>>,
    email: String,
    user_is_active: bool,
}

/// Resolve an `X-API-Key` header into a request identity.
///
/// # Flow
///
/// 1. No header: the request is public traffic, not an error
/// 2. Key without the configured prefix -> 401 `INVALID_API_KEY`
/// 3. Look up an active key by its 12-character prefix (single index hit;
///    the unique constraint on `key_prefix` keeps the lookup unambiguous)
///    -> 401 `API_KEY_NOT_FOUND` when nothing matches
/// 4. bcrypt-verify the full presented key against the stored hash
///    -> 401 `INVALID_API_KEY` on mismatch
/// 5. Past `expires_at` -> 401 `API_KEY_EXPIRED`
/// 6. Owning account deactivated -> 403 `USER_INACTIVE`
///
/// On success, stamps `last_used_at` and inserts
/// [`RequestIdentity::ApiKey`]. Unexpected store or hashing failures map to
/// 500 `AUTH_ERROR` rather than leaking detail.
pub async fn resolve_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let presented = match request
        .headers()
        .get("X-API-Key")
        .and_then(|h| h.to_str().ok())
    {
        Some(key) => key.to_string(),
        None => {
            request.extensions_mut().insert(RequestIdentity::Public);
            return Ok(next.run(request).await);
        }
    };

    if !presented.starts_with(state.config.api_key_prefix.as_str()) {
        return Err(AppError::InvalidApiKey);
    }

    let prefix = api_key::key_prefix(&presented).ok_or(AppError::InvalidApiKey)?;

    let row = sqlx::query_as::<_, KeyAuthRow>(
        r#"
        SELECT k.id, k.user_id, k.key_hash, k.name, k.permissions,
               k.rate_limit_per_hour, k.rate_limit_per_day, k.expires_at,
               u.email, u.is_active AS user_is_active
        FROM api_keys k
        JOIN users u ON u.id = k.user_id
        WHERE k.key_prefix = $1 AND k.is_active = true
        "#,
    )
    .bind(prefix)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| AppError::AuthInternal(format!("api key lookup: {e}")))?
    .ok_or(AppError::ApiKeyNotFound)?;

    // bcrypt comparison is deliberately slow; keep it off the async executor.
    let hash = row.key_hash.clone();
    let candidate = presented.clone();
    let matches = tokio::task::spawn_blocking(move || password::verify_secret(&candidate, &hash))
        .await
        .map_err(|e| AppError::AuthInternal(format!("hash verification task: {e}")))?
        .map_err(|e| AppError::AuthInternal(format!("hash verification: {e}")))?;

    if !matches {
        return Err(AppError::InvalidApiKey);
    }

    if let Some(expires_at) = row.expires_at {
        if expires_at < Utc::now() {
            return Err(AppError::ApiKeyExpired);
        }
    }

    if !row.user_is_active {
        return Err(AppError::UserInactive);
    }

    sqlx::query("UPDATE api_keys SET last_used_at = NOW() WHERE id = $1")
        .bind(row.id)
        .execute(&state.pool)
        .await
        .map_err(|e| AppError::AuthInternal(format!("stamping last_used_at: {e}")))?;

    let permissions = serde_json::from_value(row.permissions).unwrap_or_default();
    request
        .extensions_mut()
        .insert(RequestIdentity::ApiKey(ApiKeyContext {
            key_id: row.id,
            user_id: row.user_id,
            email: row.email,
            key_name: row.name,
            permissions,
            rate_limit_per_hour: row.rate_limit_per_hour,
            rate_limit_per_day: row.rate_limit_per_day,
        }));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_parsing_accepts_exact_format() {
        assert_eq!(bearer_token("Bearer abc123"), Some("abc123"));
    }

    #[test]
    fn bearer_parsing_rejects_malformed_headers() {
        // Wrong scheme
        assert_eq!(bearer_token("Token abc123"), None);
        // Scheme is case-sensitive
        assert_eq!(bearer_token("bearer abc123"), None);
        // Not exactly two parts
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer a b"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token(""), None);
    }
}

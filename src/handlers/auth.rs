//! Account and session HTTP handlers.
//!
//! This module implements the account-related API endpoints:
//! - POST /api/v1/auth/signup - Create an account
//! - POST /api/v1/auth/login - Exchange credentials for a bearer token
//! - GET /api/v1/auth/verify - Validate the current session
//! - GET/PUT /api/v1/auth/profile - Read and update the caller's profile
//! - POST /api/v1/auth/logout - Audit-only; the client discards its token
//!
//! Tokens are not server-side revocable: a logout is recorded in the audit
//! trail but the token stays valid until its natural expiry.

use axum::{
    Extension, Json,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::{
    error::AppError,
    middleware::{auth::SessionContext, client_ip},
    models::{
        audit::AuditAction,
        user::{LoginRequest, SignupRequest, UpdateProfileRequest, User, UserResponse},
    },
    services::{audit, password},
    state::AppState,
};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Validate a signup request against the configured rules.
fn validate_signup(email: &str, pass: &str, min_password_len: usize) -> Result<(), AppError> {
    if !EMAIL_RE.is_match(email) {
        return Err(AppError::Validation("Invalid email address".into()));
    }
    if pass.len() < min_password_len {
        return Err(AppError::Validation(format!(
            "Password must be at least {min_password_len} characters"
        )));
    }
    Ok(())
}

/// Create a new account.
///
/// # Endpoint
///
/// `POST /api/v1/auth/signup`
///
/// # Request Body
///
/// ```json
/// {
///   "email": "a@b.com",
///   "password": "longenough1",
///   "full_name": "Ada L.",       // optional
///   "organization": "UVM"         // optional
/// }
/// ```
///
/// # Response
///
/// - **Success (201 Created)**: the created user (no token; log in next)
/// - **Error (400)**: invalid email or password too short
/// - **Error (409)**: an account with this email already exists
///
/// Emails are lowercased before storage so lookups are case-insensitive.
pub async fn signup(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    validate_signup(
        &request.email,
        &request.password,
        state.config.password_min_length,
    )?;

    let email = request.email.to_lowercase();

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
        .bind(&email)
        .fetch_one(&state.pool)
        .await?;

    if exists {
        return Err(AppError::EmailExists);
    }

    // bcrypt is deliberately slow; keep it off the async executor.
    let cost = state.config.bcrypt_cost;
    let pass = request.password.clone();
    let hash = tokio::task::spawn_blocking(move || password::hash_secret(&pass, cost))
        .await
        .map_err(|e| AppError::AuthInternal(format!("hashing task: {e}")))??;

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, password_hash, full_name, organization)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(&hash)
    .bind(&request.full_name)
    .bind(&request.organization)
    .fetch_one(&state.pool)
    .await
    .map_err(|e| match e {
        // Two concurrent signups can both pass the existence check; the
        // unique index is the real arbiter.
        sqlx::Error::Database(ref db) if db.is_unique_violation() => AppError::EmailExists,
        other => AppError::Database(other),
    })?;

    sqlx::query("INSERT INTO user_roles (user_id, role) VALUES ($1, 'user')")
        .bind(user.id)
        .execute(&state.pool)
        .await?;

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::Signup,
        json!({ "email": user.email }),
        Some(client_ip(&headers, Some(remote))),
    )
    .await;

    let response = json!({
        "success": true,
        "user": UserResponse::from(user),
    });

    Ok((StatusCode::CREATED, Json(response)))
}

/// Exchange credentials for a bearer token.
///
/// # Endpoint
///
/// `POST /api/v1/auth/login`
///
/// # Response
///
/// - **Success (200)**: token, user, and role list
/// - **Error (401)**: unknown email or wrong password; the message is the same
///   for both so the endpoint cannot be used to enumerate accounts, but a
///   wrong password is still audit-logged as `LOGIN_FAILED`
/// - **Error (403)**: the account has been deactivated
pub async fn login(
    State(state): State<AppState>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = request.email.to_lowercase();
    let ip = client_ip(&headers, Some(remote));

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    let hash = user.password_hash.clone();
    let pass = request.password.clone();
    let matches = tokio::task::spawn_blocking(move || password::verify_secret(&pass, &hash))
        .await
        .map_err(|e| AppError::AuthInternal(format!("hashing task: {e}")))??;

    if !matches {
        audit::record(
            &state.pool,
            Some(user.id),
            AuditAction::LoginFailed,
            json!({ "email": email, "reason": "invalid_password" }),
            Some(ip),
        )
        .await;
        return Err(AppError::InvalidCredentials);
    }

    if !user.is_active {
        return Err(AppError::AccountInactive);
    }

    let roles: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
        .bind(user.id)
        .fetch_all(&state.pool)
        .await?;

    let token = state
        .tokens
        .issue(&user)
        .map_err(|e| AppError::AuthInternal(format!("issuing token: {e}")))?;

    audit::record(
        &state.pool,
        Some(user.id),
        AuditAction::LoginSuccess,
        json!({ "email": user.email }),
        Some(ip),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "token": token,
        "user": UserResponse::from(user),
        "roles": roles,
    })))
}

/// Fetch the current user and roles by session user id.
async fn fetch_session_user(
    state: &AppState,
    user_id: Uuid,
) -> Result<(User, Vec<String>), AppError> {
    // The token verified but its subject must still exist and be active.
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(&state.pool)
        .await?
        .ok_or(AppError::InvalidToken)?;

    if !user.is_active {
        return Err(AppError::AccountInactive);
    }

    let roles: Vec<String> = sqlx::query_scalar("SELECT role FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .fetch_all(&state.pool)
        .await?;

    Ok((user, roles))
}

/// Validate the current session.
///
/// `GET /api/v1/auth/verify` returns the user and roles behind the verified
/// token so the front end can restore a session after a page reload.
pub async fn verify(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (user, roles) = fetch_session_user(&state, session.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "user": UserResponse::from(user),
        "roles": roles,
    })))
}

/// Read the caller's profile.
///
/// `GET /api/v1/auth/profile`
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
) -> Result<Json<serde_json::Value>, AppError> {
    let (user, _) = fetch_session_user(&state, session.user_id).await?;

    Ok(Json(json!({
        "success": true,
        "user": UserResponse::from(user),
    })))
}

/// Update the caller's profile.
///
/// `PUT /api/v1/auth/profile`. Only supplied fields change; an empty body is
/// rejected as a no-op. Audit-logged as `PROFILE_UPDATE`.
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if request.is_empty() {
        return Err(AppError::NoUpdates);
    }

    let user = sqlx::query_as::<_, User>(
        r#"
        UPDATE users
        SET full_name = COALESCE($1, full_name),
            organization = COALESCE($2, organization),
            updated_at = NOW()
        WHERE id = $3
        RETURNING *
        "#,
    )
    .bind(&request.full_name)
    .bind(&request.organization)
    .bind(session.user_id)
    .fetch_one(&state.pool)
    .await?;

    audit::record(
        &state.pool,
        Some(session.user_id),
        AuditAction::ProfileUpdate,
        json!({
            "updated_full_name": request.full_name.is_some(),
            "updated_organization": request.organization.is_some(),
        }),
        Some(client_ip(&headers, Some(remote))),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "user": UserResponse::from(user),
    })))
}

/// Log out.
///
/// `POST /api/v1/auth/logout` writes the audit entry; the client discards
/// its token. The token itself remains valid until expiry (no server-side
/// revocation in this design).
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<SessionContext>,
    ConnectInfo(remote): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    audit::record(
        &state.pool,
        Some(session.user_id),
        AuditAction::Logout,
        json!({ "email": session.email }),
        Some(client_ip(&headers, Some(remote))),
    )
    .await;

    Ok(Json(json!({
        "success": true,
        "message": "Logged out",
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plausible_emails() {
        assert!(validate_signup("a@b.com", "longenough1", 8).is_ok());
        assert!(validate_signup("first.last@sub.example.org", "longenough1", 8).is_ok());
    }

    #[test]
    fn rejects_malformed_emails() {
        for email in ["", "plain", "no@dot", "two@@at.com", "spaces in@it.com"] {
            assert!(
                validate_signup(email, "longenough1", 8).is_err(),
                "{email:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_short_passwords() {
        assert!(validate_signup("a@b.com", "short", 8).is_err());
        // Exactly at the minimum is fine.
        assert!(validate_signup("a@b.com", "12345678", 8).is_ok());
    }
}

//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with appropriate status codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a specific HTTP status code and a stable error code
/// string that clients can branch on.
///
/// # Error Categories
///
/// - **Client input errors (400)**: validation failures, no-op updates, key cap
/// - **Authentication errors (401)**: missing/malformed/expired/invalid tokens and keys
/// - **Authorization errors (403)**: deactivated accounts
/// - **Not-found errors (404)**: keys not existing or not owned by the caller
/// - **Conflict errors (409)**: duplicate signup email
/// - **Internal errors (500)**: unexpected store or hashing failures
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password or key hashing failed.
    #[error("Hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// Unexpected failure inside the authentication path.
    ///
    /// Returned as a generic 500 so internal detail never reaches the client.
    #[error("Authentication error: {0}")]
    AuthInternal(String),

    /// No `Authorization` header on an endpoint that requires a session.
    #[error("Authentication required")]
    MissingToken,

    /// `Authorization` header is not exactly `Bearer <token>`.
    #[error("Invalid authorization header format")]
    InvalidTokenFormat,

    /// Token signature is valid but the token has expired.
    ///
    /// Distinguished from `InvalidToken` so the client can prompt a re-login
    /// instead of treating the token as forged.
    #[error("Token has expired, please log in again")]
    TokenExpired,

    /// Token failed verification for any reason other than expiry.
    #[error("Invalid token")]
    InvalidToken,

    /// Presented API key is malformed or its hash does not match.
    #[error("Invalid API key")]
    InvalidApiKey,

    /// No active key matches the presented key's prefix.
    #[error("API key not found")]
    ApiKeyNotFound,

    /// The key authenticated but its expiry date has passed.
    #[error("API key has expired")]
    ApiKeyExpired,

    /// The key's owning user account has been deactivated.
    #[error("User account is inactive")]
    UserInactive,

    /// Login attempted against a deactivated account.
    #[error("Account is inactive")]
    AccountInactive,

    /// Unknown email or wrong password.
    ///
    /// Deliberately identical for both cases so the endpoint cannot be used to
    /// enumerate registered email addresses.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Signup with an email that already has an account.
    #[error("An account with this email already exists")]
    EmailExists,

    /// The caller already holds the maximum number of API keys.
    #[error("Maximum number of API keys reached")]
    KeyLimitReached,

    /// API key does not exist or is not owned by the caller.
    #[error("API key not found")]
    KeyNotFound,

    /// Update request supplied no fields to change.
    #[error("No fields to update")]
    NoUpdates,

    /// Request body or parameters are invalid.
    /// The String contains details about what was invalid.
    #[error("{0}")]
    Validation(String),
}

impl AppError {
    /// HTTP status code for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Hash(_) | AppError::AuthInternal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::MissingToken
            | AppError::InvalidTokenFormat
            | AppError::TokenExpired
            | AppError::InvalidToken
            | AppError::InvalidApiKey
            | AppError::ApiKeyNotFound
            | AppError::ApiKeyExpired
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::UserInactive | AppError::AccountInactive => StatusCode::FORBIDDEN,
            AppError::KeyNotFound => StatusCode::NOT_FOUND,
            AppError::EmailExists => StatusCode::CONFLICT,
            AppError::KeyLimitReached | AppError::NoUpdates | AppError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    /// Stable error code string included in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) | AppError::Hash(_) => "INTERNAL_ERROR",
            AppError::AuthInternal(_) => "AUTH_ERROR",
            AppError::MissingToken => "UNAUTHORIZED",
            AppError::InvalidTokenFormat => "INVALID_TOKEN_FORMAT",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::InvalidApiKey => "INVALID_API_KEY",
            AppError::ApiKeyNotFound => "API_KEY_NOT_FOUND",
            AppError::ApiKeyExpired => "API_KEY_EXPIRED",
            AppError::UserInactive => "USER_INACTIVE",
            AppError::AccountInactive => "ACCOUNT_INACTIVE",
            AppError::InvalidCredentials => "INVALID_CREDENTIALS",
            AppError::EmailExists => "EMAIL_EXISTS",
            AppError::KeyLimitReached => "KEY_LIMIT_REACHED",
            AppError::KeyNotFound => "KEY_NOT_FOUND",
            AppError::NoUpdates => "NO_UPDATES",
            AppError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "ERROR_CODE",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // 500s hide their detail from the client; log it instead.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("internal error: {self}");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(AppError::MissingToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::UserInactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::AccountInactive.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::KeyNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::EmailExists.status(), StatusCode::CONFLICT);
        assert_eq!(AppError::KeyLimitReached.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NoUpdates.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::AuthInternal("boom".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn error_codes_are_stable() {
        assert_eq!(AppError::InvalidApiKey.code(), "INVALID_API_KEY");
        assert_eq!(AppError::ApiKeyExpired.code(), "API_KEY_EXPIRED");
        assert_eq!(AppError::InvalidTokenFormat.code(), "INVALID_TOKEN_FORMAT");
        assert_eq!(AppError::AuthInternal("x".into()).code(), "AUTH_ERROR");
        assert_eq!(AppError::KeyLimitReached.code(), "KEY_LIMIT_REACHED");
    }

    #[test]
    fn login_failures_share_one_message() {
        // Unknown email and wrong password must be indistinguishable to the
        // client; both paths return this exact variant.
        assert_eq!(
            AppError::InvalidCredentials.to_string(),
            "Invalid email or password"
        );
        assert_eq!(AppError::InvalidCredentials.code(), "INVALID_CREDENTIALS");
    }
}

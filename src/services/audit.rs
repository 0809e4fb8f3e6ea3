//! Audit trail recording.
//!
//! Appends immutable rows to `audit_log`. Recording is best-effort: a failed
//! insert is logged and swallowed so the audit trail can never fail the
//! operation it documents.

use uuid::Uuid;

use crate::{db::DbPool, models::audit::AuditAction};

/// Record a security-relevant action.
///
/// `details` is free-form JSON describing the action (key names, changed
/// fields, failure reasons). `user_id` is absent only for events that cannot
/// be attributed, which in practice does not occur for the current actions.
pub async fn record(
    pool: &DbPool,
    user_id: Option<Uuid>,
    action: AuditAction,
    details: serde_json::Value,
    ip_address: Option<String>,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO audit_log (user_id, action, details, ip_address)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(details)
    .bind(ip_address)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!("failed to write audit entry {}: {e}", action.as_str());
    }
}

//! Post-response usage logging.
//!
//! Records one `api_key_usage` row per completed authenticated request and
//! bumps the key's lifetime counter. The write happens in a detached task
//! after the response is produced, so it never delays the client, and its
//! failures are logged and swallowed: usage analytics are best-effort and must
//! never cause a user-visible error.
//!
//! Anonymous traffic is not logged per-event; it is only visible through the
//! rate-limit counters.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{db::DbPool, middleware::auth::RequestIdentity, state::AppState};

/// Track latency and outcome for API-key traffic.
///
/// Runs inside `resolve_api_key` (so the identity is available) and outside
/// the rate limiter (so rejected 429s are recorded against the key too).
pub async fn track_usage(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let identity = request.extensions().get::<RequestIdentity>().cloned();
    let endpoint = request.uri().path().to_string();
    let method = request.method().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    if let Some(RequestIdentity::ApiKey(ctx)) = identity {
        let status = response.status().as_u16() as i32;
        let elapsed_ms = started.elapsed().as_millis() as i32;
        let pool = state.pool.clone();

        // Fire-and-forget; the response is already on its way out.
        tokio::spawn(async move {
            if let Err(e) =
                record_usage(&pool, ctx.key_id, &endpoint, &method, status, elapsed_ms).await
            {
                tracing::warn!("failed to record usage for key {}: {e}", ctx.key_id);
            }
        });
    }

    response
}

async fn record_usage(
    pool: &DbPool,
    key_id: Uuid,
    endpoint: &str,
    method: &str,
    status_code: i32,
    response_time_ms: i32,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO api_key_usage (api_key_id, endpoint, method, status_code, response_time_ms)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(key_id)
    .bind(endpoint)
    .bind(method)
    .bind(status_code)
    .bind(response_time_ms)
    .execute(pool)
    .await?;

    sqlx::query("UPDATE api_keys SET total_requests = total_requests + 1 WHERE id = $1")
        .bind(key_id)
        .execute(pool)
        .await?;

    Ok(())
}

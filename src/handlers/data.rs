//! Public sensor data endpoint.
//!
//! One read-only listing endpoint over the monitoring network's readings.
//! It runs behind the full public pipeline (API key resolution, usage
//! tracking, rate limiting) and enforces a hard cap on rows per response.
//! The front end's CSV downloader relies on that cap being stable: it splits
//! large time ranges recursively until every sub-range fits in one page.

use axum::{
    Json,
    extract::{Query, State},
};
use serde_json::json;

use crate::{
    error::AppError,
    models::reading::{Reading, ReadingsQuery},
    state::AppState,
};

/// List sensor readings, newest first.
///
/// # Endpoint
///
/// `GET /api/v1/data/readings?station=&start=&end=&limit=`
///
/// All filters are optional. `limit` is honored only up to the configured
/// maximum page size; the effective limit is echoed back so clients can tell
/// when a page may have been truncated.
pub async fn list_readings(
    State(state): State<AppState>,
    Query(query): Query<ReadingsQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let limit = query
        .limit
        .unwrap_or(state.config.max_page_size)
        .clamp(1, state.config.max_page_size);

    let readings = sqlx::query_as::<_, Reading>(
        r#"
        SELECT id, station, metric, value, recorded_at
        FROM sensor_readings
        WHERE ($1::text IS NULL OR station = $1)
          AND ($2::timestamptz IS NULL OR recorded_at >= $2)
          AND ($3::timestamptz IS NULL OR recorded_at <= $3)
        ORDER BY recorded_at DESC
        LIMIT $4
        "#,
    )
    .bind(&query.station)
    .bind(query.start)
    .bind(query.end)
    .bind(limit)
    .fetch_all(&state.pool)
    .await?;

    Ok(Json(json!({
        "success": true,
        "count": readings.len(),
        "limit": limit,
        "readings": readings,
    })))
}

//! API key usage aggregation models.
//!
//! Usage events are append-only rows written by the usage logger after each
//! authenticated request. These types carry the three aggregate views served
//! by `GET /api/v1/api-keys/{key_id}/usage`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Query parameters for the usage endpoint.
#[derive(Debug, Deserialize)]
pub struct UsageQuery {
    /// Trailing window in days (default 7)
    pub days: Option<i32>,
}

/// Request count and average latency for one endpoint.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct EndpointUsage {
    pub endpoint: String,
    pub request_count: i64,
    pub avg_response_ms: Option<f64>,
}

/// Request count for one calendar day.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct DailyUsage {
    pub day: NaiveDate,
    pub request_count: i64,
}

/// Request count for one HTTP status code.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct StatusUsage {
    pub status_code: i32,
    pub request_count: i64,
}

/// Aggregated usage over the requested trailing window.
#[derive(Debug, Serialize)]
pub struct UsageResponse {
    /// Window the aggregates cover, in days
    pub days: i32,

    /// Top 10 endpoints by request count
    pub by_endpoint: Vec<EndpointUsage>,
    pub by_day: Vec<DailyUsage>,
    pub by_status: Vec<StatusUsage>,
}

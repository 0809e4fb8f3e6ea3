//! Sensor reading model for the public data endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sensor measurement from the monitoring network.
///
/// Maps to the `sensor_readings` table. The API only ever reads this table;
/// ingestion happens upstream.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Reading {
    pub id: i64,

    /// Station identifier within the network
    pub station: String,

    /// Measured quantity, e.g. "air_temp" or "snow_depth"
    pub metric: String,

    pub value: f64,
    pub recorded_at: DateTime<Utc>,
}

/// Query parameters for `GET /api/v1/data/readings`.
#[derive(Debug, Deserialize)]
pub struct ReadingsQuery {
    pub station: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,

    /// Requested page size; capped server-side so clients paging large ranges
    /// (the CSV downloader splits ranges recursively) get a bounded response.
    pub limit: Option<i64>,
}

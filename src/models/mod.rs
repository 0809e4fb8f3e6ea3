//! Data models representing database entities.
//!
//! This module contains all data structures that map to database tables,
//! along with the request/response types exchanged with API clients.

/// API key credential model
pub mod api_key;
/// Audit log actions
pub mod audit;
/// Sensor reading model for the public data endpoint
pub mod reading;
/// API key usage aggregation models
pub mod usage;
/// User account model
pub mod user;

//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Performs business logic (database queries, validation)
//! 3. Returns HTTP response (JSON, status code)

/// API key lifecycle endpoints
pub mod api_keys;
/// Account and session endpoints
pub mod auth;
/// Public sensor data endpoint
pub mod data;
/// Health check endpoint
pub mod health;

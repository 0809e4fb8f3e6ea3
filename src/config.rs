//! Application configuration management.
//!
//! This module handles loading configuration from environment variables.
//! It uses the `envy` crate to automatically deserialize environment variables into a type-safe struct.
//!
//! The struct is built exactly once in `main` and shared read-only through
//! application state; no component reads the environment after startup.

use serde::Deserialize;

/// Fallback signing secret used when `JWT_SECRET` is not set.
///
/// Only acceptable for local development. `main` logs a loud warning when the
/// process is running with this value.
pub const DEV_JWT_SECRET: &str = "dev-secret-do-not-use-in-production";

/// Application configuration loaded from environment variables.
///
/// # Environment Variables
///
/// - `DATABASE_URL` (required): PostgreSQL connection string
/// - `SERVER_PORT` (optional): HTTP server port, defaults to 3000
/// - `JWT_SECRET` (optional): token signing secret, defaults to a development value
/// - `JWT_EXPIRY_HOURS`, `JWT_ISSUER`, `JWT_AUDIENCE`: token parameters
/// - `BCRYPT_COST`: cost factor for password and API-key-secret hashing
/// - `API_KEY_PREFIX`, `API_KEY_LENGTH`: shape of generated API keys
/// - `PUBLIC_RATE_LIMIT_PER_HOUR` / `PUBLIC_RATE_LIMIT_PER_DAY`: anonymous quota
/// - `AUTH_RATE_LIMIT_PER_HOUR` / `AUTH_RATE_LIMIT_PER_DAY`: API-key quota defaults
/// - `PASSWORD_MIN_LENGTH`: minimum signup password length
/// - `MAX_PAGE_SIZE`: hard cap on rows per data request
/// - `CLEANUP_INTERVAL_SECS`: period of the rate-limit window sweep
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,

    #[serde(default = "default_port")]
    pub server_port: u16,

    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiry_hours")]
    pub jwt_expiry_hours: i64,

    #[serde(default = "default_jwt_issuer")]
    pub jwt_issuer: String,

    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,

    #[serde(default = "default_api_key_prefix")]
    pub api_key_prefix: String,

    /// Number of random characters after the prefix in a generated key.
    #[serde(default = "default_api_key_length")]
    pub api_key_length: usize,

    #[serde(default = "default_public_rate_limit_per_hour")]
    pub public_rate_limit_per_hour: i32,

    #[serde(default = "default_public_rate_limit_per_day")]
    pub public_rate_limit_per_day: i32,

    #[serde(default = "default_auth_rate_limit_per_hour")]
    pub auth_rate_limit_per_hour: i32,

    #[serde(default = "default_auth_rate_limit_per_day")]
    pub auth_rate_limit_per_day: i32,

    #[serde(default = "default_password_min_length")]
    pub password_min_length: usize,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: i64,

    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

fn default_port() -> u16 {
    3000
}

fn default_jwt_secret() -> String {
    DEV_JWT_SECRET.to_string()
}

fn default_jwt_expiry_hours() -> i64 {
    24
}

fn default_jwt_issuer() -> String {
    "sensor-data-api".to_string()
}

fn default_jwt_audience() -> String {
    "sensor-data-clients".to_string()
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_api_key_prefix() -> String {
    "s2s_".to_string()
}

fn default_api_key_length() -> usize {
    32
}

fn default_public_rate_limit_per_hour() -> i32 {
    100
}

fn default_public_rate_limit_per_day() -> i32 {
    500
}

fn default_auth_rate_limit_per_hour() -> i32 {
    1000
}

fn default_auth_rate_limit_per_day() -> i32 {
    10000
}

fn default_password_min_length() -> usize {
    8
}

fn default_max_page_size() -> i64 {
    10000
}

fn default_cleanup_interval_secs() -> u64 {
    600
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// This method first attempts to load a `.env` file (which is optional),
    /// then reads environment variables and deserializes them into a Config struct.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing (e.g., DATABASE_URL)
    /// - Environment variable values cannot be parsed into expected types
    pub fn from_env() -> Result<Self, envy::Error> {
        // Try to load .env file if it exists (does nothing if not found)
        dotenvy::dotenv().ok();

        // Parse environment variables into Config struct
        // Field names are automatically converted: database_url -> DATABASE_URL
        envy::from_env::<Config>()
    }

    /// True when the process is running with the development signing secret.
    pub fn using_default_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

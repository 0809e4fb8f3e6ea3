//! Sensor Data API - Main Application Entry Point
//!
//! REST API for a Vermont environmental monitoring network. It provides user
//! accounts, API key issuance with per-key rate limiting, and a bounded
//! read-only endpoint over the network's sensor readings.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Sessions**: signed time-bound JWTs
//! - **API keys**: bcrypt-hashed secrets with prefix-indexed lookup
//! - **Format**: JSON requests/responses
//!
//! # Request pipeline (data routes)
//!
//! identity resolution -> usage tracking -> rate limiting -> handler.
//! The order is load-bearing: the limiter keys its counters off the resolved
//! identity, and the usage logger sees every outcome including 429s.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool and run migrations
//! 3. Spawn the periodic rate-limit window sweep
//! 4. Build HTTP router with routes and middleware
//! 5. Start server on configured port

mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod services;
mod state;

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = config::Config::from_env()?;
    tracing::info!("Configuration loaded");

    if config.using_default_secret() {
        // Tokens signed with the development secret are forgeable by anyone
        // who has read the source. Loud, not fatal: local development relies
        // on the fallback.
        tracing::warn!("JWT_SECRET is not set; using the development fallback secret. Do NOT run production like this.");
    }

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let cleanup_interval = Duration::from_secs(config.cleanup_interval_secs);
    let state = AppState::new(pool, config);

    // Periodic sweep of expired rate-limit windows. Independent of any
    // request lifecycle; errors are logged and the next tick retries.
    let cleanup_pool = state.pool.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_interval);
        loop {
            ticker.tick().await;
            match middleware::rate_limit::cleanup_expired_windows(&cleanup_pool).await {
                Ok(0) => {}
                Ok(n) => tracing::info!("swept {n} expired rate-limit windows"),
                Err(e) => tracing::warn!("rate-limit window sweep failed: {e}"),
            }
        }
    });

    // Session routes: everything behind a verified bearer token
    let session_routes = Router::new()
        .route("/api/v1/auth/verify", get(handlers::auth::verify))
        .route("/api/v1/auth/logout", post(handlers::auth::logout))
        .route(
            "/api/v1/auth/profile",
            get(handlers::auth::get_profile).put(handlers::auth::update_profile),
        )
        .route(
            "/api/v1/api-keys",
            get(handlers::api_keys::list_keys).post(handlers::api_keys::create_key),
        )
        .route(
            "/api/v1/api-keys/{key_id}",
            get(handlers::api_keys::get_key)
                .put(handlers::api_keys::update_key)
                .delete(handlers::api_keys::revoke_key),
        )
        .route(
            "/api/v1/api-keys/{key_id}/usage",
            get(handlers::api_keys::key_usage),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::require_session,
        ));

    // Data routes: public, with the full identity/usage/rate-limit pipeline.
    // route_layer wraps outside-in as layers are added, so the add order here
    // is the reverse of the execution order.
    let data_routes = Router::new()
        .route("/api/v1/data/readings", get(handlers::data::list_readings))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::rate_limit::rate_limit,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::usage::track_usage,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::resolve_api_key,
        ))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_session,
        ));

    let app = Router::new()
        // Public routes (no authentication required)
        .route("/health", get(handlers::health::health_check))
        .route("/api/v1/auth/signup", post(handlers::auth::signup))
        .route("/api/v1/auth/login", post(handlers::auth::login))
        .merge(session_routes)
        .merge(data_routes)
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        // The browser front end is served from a different origin
        .layer(CorsLayer::permissive())
        .with_state(state.clone());

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", state.config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // ConnectInfo carries the peer address for IP-keyed rate limiting
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

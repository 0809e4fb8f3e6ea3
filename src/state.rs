//! Shared application state.
//!
//! Everything a handler or middleware needs is constructed once in `main` and
//! handed over explicitly through axum's `State` extractor: the connection
//! pool, the immutable configuration, and the token service. There is no
//! module-level mutable state anywhere in the application.

use std::sync::Arc;

use crate::{config::Config, db::DbPool, services::token::TokenService};

/// Application state cloned into every handler and middleware.
///
/// Cloning is cheap: the pool is already reference-counted internally and the
/// config lives behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: DbPool,

    /// Immutable configuration built from the environment at startup
    pub config: Arc<Config>,

    /// Token issuer/verifier derived from the configured signing secret
    pub tokens: TokenService,
}

impl AppState {
    pub fn new(pool: DbPool, config: Config) -> Self {
        let tokens = TokenService::new(&config);
        Self {
            pool,
            config: Arc::new(config),
            tokens,
        }
    }
}

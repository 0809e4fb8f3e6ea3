//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Enforce rate limits
//! - Record usage after the response is sent
//! - Short-circuit requests (reject unauthorized or over-quota)
//!
//! Pipeline order on the data routes is fixed and load-bearing:
//! identity resolution -> usage tracking -> rate limiting -> handler.
//! The limiter must key off the resolved identity, not the raw headers.

use std::net::SocketAddr;

use axum::http::HeaderMap;

/// Session and API key authentication middleware
pub mod auth;
/// Distributed per-identity rate limiting
pub mod rate_limit;
/// Post-response usage logging
pub mod usage;

/// Best available client address for rate limiting and audit entries.
///
/// Prefers the first `X-Forwarded-For` hop (the service runs behind a reverse
/// proxy in production), falling back to the socket peer address.
pub fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    if let Some(forwarded) = headers.get("x-forwarded-for").and_then(|v| v.to_str().ok()) {
        if let Some(first) = forwarded.split(',').next() {
            let first = first.trim();
            if !first.is_empty() {
                return first.to_string();
            }
        }
    }

    match remote {
        Some(addr) => addr.ip().to_string(),
        None => "unknown".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forwarded_header_wins_over_socket() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        let remote: SocketAddr = "127.0.0.1:9999".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(remote)), "203.0.113.7");
    }

    #[test]
    fn falls_back_to_socket_address() {
        let headers = HeaderMap::new();
        let remote: SocketAddr = "192.0.2.4:1234".parse().unwrap();

        assert_eq!(client_ip(&headers, Some(remote)), "192.0.2.4");
        assert_eq!(client_ip(&headers, None), "unknown");
    }
}

//! Client identity resolution from proxy headers.
//!
//! The result is a spoofable heuristic. It keys rate-limit buckets and log
//! lines; it is never an authenticated identity.

use axum::http::HeaderMap;

/// Used when no forwarding header carries a usable address.
pub const LOOPBACK: &str = "127.0.0.1";

/// Headers consulted in order of precedence.
const CLIENT_IP_HEADERS: [&str; 3] = ["x-forwarded-for", "x-real-ip", "cf-connecting-ip"];

/// Resolve the client IP: first `X-Forwarded-For` entry, then `X-Real-IP`,
/// then `CF-Connecting-IP`, then loopback.
pub fn resolve_client_ip(headers: &HeaderMap) -> String {
    CLIENT_IP_HEADERS
        .iter()
        .filter_map(|name| headers.get(*name))
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| {
            // Only the left-most hop is the original client.
            let first = value.split(',').next().unwrap_or_default().trim();
            (!first.is_empty()).then(|| first.to_string())
        })
        .next()
        .unwrap_or_else(|| LOOPBACK.to_string())
}

/// The `User-Agent` header, or empty when absent or not valid text.
pub fn user_agent(headers: &HeaderMap) -> &str {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

//! Response composition for gatekeeper outcomes.
//!
//! # Responsibilities
//! - Render denials as a uniform JSON body `{error, timestamp, requestId}`
//! - Attach `Retry-After` and `X-RateLimit-*` on throttled responses
//! - Decorate admitted responses with correlation and quota headers
//!
//! # Design Decisions
//! - The body never names the rule that fired; the category is logged only
//! - Timestamps are ISO-8601 UTC with millisecond precision

use std::time::Duration;

use axum::{
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::http::request::{RequestId, X_REQUEST_ID};
use crate::security::{RateLimitStatus, SecurityDecision};

pub const X_RATELIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
pub const X_RATELIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
pub const X_RATELIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");
pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

/// Uniform denial body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DenialBody {
    pub error: &'static str,
    pub timestamp: String,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

/// Client-facing message for a denial status.
pub fn error_message(status: StatusCode) -> &'static str {
    match status {
        StatusCode::FORBIDDEN => "Access denied",
        StatusCode::TOO_MANY_REQUESTS => "Too many requests",
        StatusCode::SERVICE_UNAVAILABLE => "Service temporarily unavailable",
        _ => "Invalid request",
    }
}

pub fn iso8601(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Build the response for a non-admitting decision.
///
/// An `Admit` decision has no response of its own; callers forward the
/// request instead. Passing one here yields a bare 200 with the body shape
/// intact.
pub fn denial_response(
    decision: &SecurityDecision,
    request_id: &RequestId,
    now: DateTime<Utc>,
) -> Response {
    let status = decision.status();
    let retry_after = match decision {
        SecurityDecision::Throttle {
            retry_after_secs, ..
        } => Some(*retry_after_secs),
        _ => None,
    };

    let body = DenialBody {
        error: error_message(status),
        timestamp: iso8601(now),
        request_id: request_id.to_string(),
        retry_after,
    };

    let mut response = (status, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(X_REQUEST_ID, request_id.header_value());

    if let SecurityDecision::Throttle {
        retry_after_secs,
        quota,
    } = decision
    {
        headers.insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        insert_quota_headers(headers, quota);
    }

    response
}

/// Headers added to a response the application produced.
pub fn decorate_admitted(
    headers: &mut HeaderMap,
    request_id: &RequestId,
    quota: Option<&RateLimitStatus>,
    elapsed: Option<Duration>,
) {
    headers.insert(X_REQUEST_ID, request_id.header_value());

    if let Some(quota) = quota {
        insert_quota_headers(headers, quota);
    }

    if let Some(elapsed) = elapsed {
        if let Ok(value) = HeaderValue::from_str(&format!("{}ms", elapsed.as_millis())) {
            headers.insert(X_RESPONSE_TIME, value);
        }
    }
}

fn insert_quota_headers(headers: &mut HeaderMap, quota: &RateLimitStatus) {
    headers.insert(X_RATELIMIT_LIMIT, HeaderValue::from(quota.limit));
    headers.insert(X_RATELIMIT_REMAINING, HeaderValue::from(quota.remaining()));
    if let Ok(value) = HeaderValue::from_str(&iso8601(quota.reset_at)) {
        headers.insert(X_RATELIMIT_RESET, value);
    }
}

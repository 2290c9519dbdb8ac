//! Request identity and inspection context.
//!
//! # Responsibilities
//! - Generate a fresh correlation ID per request (UUID v4)
//! - Extract everything the security checks look at (method, raw and
//!   canonical path, headers, decoded query pairs, client IP, user agent) in
//!   one place
//!
//! # Design Decisions
//! - The context borrows from the request; only the decoded query pairs and
//!   the canonical path are owned
//! - Checks match against `canonical_path`; `path` is kept for logs
//! - A client-supplied `X-Request-ID` is overwritten, never trusted

use std::fmt;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri};
use uuid::Uuid;

use crate::routing::canonical_path;
use crate::security::identity::{resolve_client_ip, user_agent};

/// Correlation header set on forwarded requests and on every response.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Per-request correlation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> HeaderValue {
        // A hyphenated UUID is always a valid header value.
        HeaderValue::from_str(&self.0).unwrap_or_else(|_| HeaderValue::from_static("unknown"))
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Access to the request ID attached by the gatekeeper.
pub trait RequestIdExt {
    fn request_id(&self) -> Option<&RequestId>;
}

impl<B> RequestIdExt for Request<B> {
    fn request_id(&self) -> Option<&RequestId> {
        self.extensions().get::<RequestId>()
    }
}

/// Everything the checks need to know about one request.
#[derive(Debug)]
pub struct RequestContext<'a> {
    pub request_id: RequestId,
    pub method: &'a Method,
    pub path: &'a str,
    pub canonical_path: String,
    pub headers: &'a HeaderMap,
    pub query: Vec<(String, String)>,
    pub client_ip: String,
    pub user_agent: &'a str,
}

impl<'a> RequestContext<'a> {
    pub fn new(request_id: RequestId, method: &'a Method, uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self {
            request_id,
            method,
            path: uri.path(),
            canonical_path: canonical_path(uri.path()),
            headers,
            query: parse_query(uri),
            client_ip: resolve_client_ip(headers),
            user_agent: user_agent(headers),
        }
    }

    pub fn from_request<B>(request_id: RequestId, request: &'a Request<B>) -> Self {
        Self::new(request_id, request.method(), request.uri(), request.headers())
    }
}

/// Percent-decoded `application/x-www-form-urlencoded` query pairs.
pub fn parse_query(uri: &Uri) -> Vec<(String, String)> {
    uri.query()
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .into_owned()
                .collect()
        })
        .unwrap_or_default()
}

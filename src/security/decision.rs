//! Gatekeeper outcomes.

use axum::http::StatusCode;

use crate::security::rate_limit::RateLimitStatus;

/// The rule category behind a denial. Logged and counted, never returned to
/// the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    BlockedIp,
    BlockedUserAgent,
    BlockedPath,
    HeadersTooLarge,
    HeaderInjection,
    SuspiciousContentType,
    SqlInjection,
    Xss,
    InternalFault,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::BlockedIp => "blocked_ip",
            DenyReason::BlockedUserAgent => "blocked_user_agent",
            DenyReason::BlockedPath => "blocked_path",
            DenyReason::HeadersTooLarge => "headers_too_large",
            DenyReason::HeaderInjection => "header_injection",
            DenyReason::SuspiciousContentType => "suspicious_content_type",
            DenyReason::SqlInjection => "sql_injection",
            DenyReason::Xss => "xss",
            DenyReason::InternalFault => "internal_fault",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            DenyReason::BlockedIp | DenyReason::BlockedUserAgent | DenyReason::BlockedPath => {
                StatusCode::FORBIDDEN
            }
            DenyReason::HeadersTooLarge
            | DenyReason::HeaderInjection
            | DenyReason::SuspiciousContentType
            | DenyReason::SqlInjection
            | DenyReason::Xss => StatusCode::BAD_REQUEST,
            DenyReason::InternalFault => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl std::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happens to a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityDecision {
    /// Forward to the application. Carries the caller's rate-limit standing
    /// when the limiter ran.
    Admit { quota: Option<RateLimitStatus> },

    /// Reject outright.
    Deny { status: StatusCode, reason: DenyReason },

    /// Reject because the rate limit is spent.
    Throttle {
        retry_after_secs: u64,
        quota: RateLimitStatus,
    },
}

impl SecurityDecision {
    pub fn deny(reason: DenyReason) -> Self {
        SecurityDecision::Deny {
            status: reason.status(),
            reason,
        }
    }

    pub fn is_admit(&self) -> bool {
        matches!(self, SecurityDecision::Admit { .. })
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SecurityDecision::Admit { .. } => StatusCode::OK,
            SecurityDecision::Deny { status, .. } => *status,
            SecurityDecision::Throttle { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Label for logs and metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            SecurityDecision::Admit { .. } => "admit",
            SecurityDecision::Deny { .. } => "deny",
            SecurityDecision::Throttle { .. } => "throttle",
        }
    }
}

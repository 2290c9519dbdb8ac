//! The individual stages of the gatekeeper chain.
//!
//! Each stage implements `SecurityCheck`. Adding or reordering stages is a
//! change to the list handed to `Gatekeeper::new`, not to control flow.

use std::sync::Arc;

use thiserror::Error;

use crate::http::request::RequestContext;
use crate::security::decision::SecurityDecision;
use crate::security::deny_list::DenyList;
use crate::security::headers::HeaderRules;
use crate::security::patterns::{PatternLibrary, ThreatKind};
use crate::security::rate_limit::{RateLimitStatus, RateLimiter};
use crate::security::store::{ClientKey, StoreError};

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to object to; continue with the next check.
    Pass,
    /// Passed, and here is the caller's rate-limit standing.
    Metered(RateLimitStatus),
    /// Stop the chain with this decision.
    Terminate(SecurityDecision),
}

/// A check that could not reach a verdict.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("rate limit store: {0}")]
    Store(#[from] StoreError),
}

/// One stage of the chain.
pub trait SecurityCheck: Send + Sync {
    /// Stable name for logs and metrics.
    fn name(&self) -> &'static str;

    fn check(&self, ctx: &RequestContext<'_>) -> Result<Verdict, CheckError>;
}

/// Blocked IPs, user agents and paths → 403.
pub struct DenyListCheck {
    list: DenyList,
}

impl DenyListCheck {
    pub fn new(list: DenyList) -> Self {
        Self { list }
    }
}

impl SecurityCheck for DenyListCheck {
    fn name(&self) -> &'static str {
        "deny_list"
    }

    fn check(&self, ctx: &RequestContext<'_>) -> Result<Verdict, CheckError> {
        Ok(match self
            .list
            .classify(&ctx.client_ip, ctx.user_agent, &ctx.canonical_path)
        {
            Some(reason) => Verdict::Terminate(SecurityDecision::deny(reason)),
            None => Verdict::Pass,
        })
    }
}

/// Fixed-window limit per (client, method) → 429.
pub struct RateLimitCheck {
    limiter: Arc<RateLimiter>,
}

impl RateLimitCheck {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

impl SecurityCheck for RateLimitCheck {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn check(&self, ctx: &RequestContext<'_>) -> Result<Verdict, CheckError> {
        let key = ClientKey::new(ctx.client_ip.as_str(), ctx.method.clone());
        let status = self.limiter.check_and_consume(&key)?;

        if status.allowed {
            return Ok(Verdict::Metered(status));
        }
        Ok(Verdict::Terminate(SecurityDecision::Throttle {
            retry_after_secs: status.retry_after_secs(self.limiter.now()),
            quota: status,
        }))
    }
}

/// Header size, CR/LF and content-type rules → 400.
pub struct HeaderCheck {
    rules: HeaderRules,
}

impl HeaderCheck {
    pub fn new(rules: HeaderRules) -> Self {
        Self { rules }
    }
}

impl SecurityCheck for HeaderCheck {
    fn name(&self) -> &'static str {
        "headers"
    }

    fn check(&self, ctx: &RequestContext<'_>) -> Result<Verdict, CheckError> {
        Ok(match self.rules.validate_headers(ctx.headers, &ctx.canonical_path) {
            Ok(()) => Verdict::Pass,
            Err(violation) => {
                tracing::debug!(request_id = %ctx.request_id, violation = %violation, "Header validation failed");
                Verdict::Terminate(SecurityDecision::deny(violation.reason()))
            }
        })
    }
}

/// SQL-injection and XSS patterns in query pairs → 400.
pub struct QueryPatternCheck {
    library: PatternLibrary,
}

impl QueryPatternCheck {
    pub fn new(library: PatternLibrary) -> Self {
        Self { library }
    }
}

impl SecurityCheck for QueryPatternCheck {
    fn name(&self) -> &'static str {
        "query_patterns"
    }

    fn check(&self, ctx: &RequestContext<'_>) -> Result<Verdict, CheckError> {
        if ctx.query.is_empty() {
            return Ok(Verdict::Pass);
        }

        for kind in [ThreatKind::SqlInjection, ThreatKind::Xss] {
            if let Some(pattern) = self.library.first_match(kind, &ctx.query) {
                tracing::debug!(request_id = %ctx.request_id, pattern = %pattern.name, "Query pattern matched");
                return Ok(Verdict::Terminate(SecurityDecision::deny(kind.reason())));
            }
        }
        Ok(Verdict::Pass)
    }
}

//! The gatekeeper: an ordered chain of security checks.
//!
//! # Responsibilities
//! - Build the default chain (deny-list, rate limit, headers, query patterns)
//!   from configuration
//! - Reduce a request over the chain, stopping at the first terminal verdict
//! - Apply the fault policy when a check cannot reach a verdict
//! - Log and count every decision
//!
//! # Design Decisions
//! - Evaluation is synchronous; there are no suspension points between the
//!   first and last check
//! - The rate-limit store and clock are injected, so a shared store can be
//!   swapped in without touching the chain

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{Environment, FaultPolicy, GatekeeperConfig};
use crate::http::request::RequestContext;
use crate::observability::metrics;
use crate::routing::Scope;
use crate::security::checks::{
    DenyListCheck, HeaderCheck, QueryPatternCheck, RateLimitCheck, SecurityCheck, Verdict,
};
use crate::security::clock::{Clock, SystemClock};
use crate::security::decision::{DenyReason, SecurityDecision};
use crate::security::deny_list::DenyList;
use crate::security::headers::HeaderRules;
use crate::security::patterns::PatternLibrary;
use crate::security::rate_limit::RateLimiter;
use crate::security::store::{MemoryWindowStore, WindowStore};

/// Errors building a gatekeeper.
#[derive(Debug, Error)]
pub enum GatekeeperError {
    #[error("invalid threat pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Evaluates requests against an ordered list of checks.
pub struct Gatekeeper {
    checks: Vec<Box<dyn SecurityCheck>>,
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    scope: Scope,
    fault_policy: FaultPolicy,
    environment: Environment,
}

impl Gatekeeper {
    pub fn new(
        checks: Vec<Box<dyn SecurityCheck>>,
        limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
        scope: Scope,
        fault_policy: FaultPolicy,
        environment: Environment,
    ) -> Self {
        Self {
            checks,
            limiter,
            clock,
            scope,
            fault_policy,
            environment,
        }
    }

    /// Default chain over an in-memory store and the system clock.
    pub fn from_config(config: &GatekeeperConfig) -> Result<Self, GatekeeperError> {
        Self::with_parts(
            config,
            Arc::new(MemoryWindowStore::new()),
            Arc::new(SystemClock),
        )
    }

    /// Default chain over the given store and clock.
    pub fn with_parts(
        config: &GatekeeperConfig,
        store: Arc<dyn WindowStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, GatekeeperError> {
        let limiter = Arc::new(RateLimiter::from_config(
            &config.rate_limit,
            store,
            clock.clone(),
        ));

        let checks: Vec<Box<dyn SecurityCheck>> = vec![
            Box::new(DenyListCheck::new(DenyList::from_config(&config.deny_list))),
            Box::new(RateLimitCheck::new(limiter.clone())),
            Box::new(HeaderCheck::new(HeaderRules::from_config(&config.headers))),
            Box::new(QueryPatternCheck::new(PatternLibrary::from_config(
                &config.patterns,
            )?)),
        ];

        tracing::info!(
            checks = checks.len(),
            limit = limiter.limit(),
            window_secs = limiter.window_secs(),
            fault_policy = ?config.fault_policy,
            "Gatekeeper initialized"
        );

        Ok(Self::new(
            checks,
            limiter,
            clock,
            Scope::from_config(&config.scope),
            config.fault_policy,
            config.environment,
        ))
    }

    /// Run the chain for one request.
    pub fn evaluate(&self, ctx: &RequestContext<'_>) -> SecurityDecision {
        let mut quota = None;

        for check in &self.checks {
            match check.check(ctx) {
                Ok(Verdict::Pass) => {}
                Ok(Verdict::Metered(status)) => quota = Some(status),
                Ok(Verdict::Terminate(decision)) => {
                    self.record(ctx, &decision);
                    return decision;
                }
                Err(e) => {
                    metrics::record_check_fault(check.name());
                    match self.fault_policy {
                        FaultPolicy::FailOpen => {
                            tracing::error!(
                                request_id = %ctx.request_id,
                                check = check.name(),
                                error = %e,
                                "Check faulted, skipping it"
                            );
                        }
                        FaultPolicy::FailClosed => {
                            tracing::error!(
                                request_id = %ctx.request_id,
                                check = check.name(),
                                error = %e,
                                "Check faulted, rejecting request"
                            );
                            let decision = SecurityDecision::deny(DenyReason::InternalFault);
                            self.record(ctx, &decision);
                            return decision;
                        }
                    }
                }
            }
        }

        let decision = SecurityDecision::Admit { quota };
        self.record(ctx, &decision);
        decision
    }

    /// True when the gatekeeper should inspect this canonical path.
    pub fn in_scope(&self, path: &str) -> bool {
        self.scope.includes(path)
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn record(&self, ctx: &RequestContext<'_>, decision: &SecurityDecision) {
        match decision {
            SecurityDecision::Admit { .. } => {
                tracing::debug!(
                    request_id = %ctx.request_id,
                    client = %ctx.client_ip,
                    method = %ctx.method,
                    path = %ctx.path,
                    "Request admitted"
                );
                metrics::record_decision(decision.outcome(), "none");
            }
            SecurityDecision::Deny { status, reason } => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    client = %ctx.client_ip,
                    method = %ctx.method,
                    path = %ctx.path,
                    status = status.as_u16(),
                    reason = %reason,
                    "Request denied"
                );
                metrics::record_decision(decision.outcome(), reason.as_str());
            }
            SecurityDecision::Throttle {
                retry_after_secs,
                quota,
            } => {
                tracing::warn!(
                    request_id = %ctx.request_id,
                    client = %ctx.client_ip,
                    method = %ctx.method,
                    path = %ctx.path,
                    limit = quota.limit,
                    retry_after_secs,
                    "Rate limit exceeded"
                );
                metrics::record_decision(decision.outcome(), "rate_limited");
            }
        }
    }
}

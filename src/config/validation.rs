//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Reject deny-list entries that would match everything
//! - Compile operator-supplied patterns under the size ceiling
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatekeeperConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::{HeaderName, HeaderValue};
use thiserror::Error;

use crate::config::schema::{GatekeeperConfig, PLACEHOLDER_ADMIN_KEY};
use crate::security::patterns::compile_pattern;

/// A single semantic problem in a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} is not a socket address: {value}")]
    Address { field: &'static str, value: String },

    #[error("{field} entry {value:?} must start with '/'")]
    Prefix { field: &'static str, value: String },

    #[error("{0} contains an empty entry")]
    EmptyEntry(&'static str),

    #[error("security header {0:?} is not a valid header")]
    Header(String),

    #[error("pattern {pattern:?} rejected: {reason}")]
    Pattern { pattern: String, reason: String },

    #[error("admin.api_key must be changed before enabling the admin API")]
    PlaceholderAdminKey,
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &GatekeeperConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero("rate_limit.max_requests"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.window_secs"));
    }
    if config.rate_limit.sweep_interval_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.sweep_interval_secs"));
    }
    if config.headers.max_total_bytes == 0 {
        errors.push(ValidationError::Zero("headers.max_total_bytes"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_address(&mut errors, "upstream.address", &config.upstream.address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }
    if config.admin.enabled {
        check_address(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() || config.admin.api_key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::PlaceholderAdminKey);
        }
    }

    check_prefix(&mut errors, "headers.api_prefix", &config.headers.api_prefix);
    for path in &config.deny_list.paths {
        check_prefix(&mut errors, "deny_list.paths", path);
    }
    for prefix in &config.scope.excluded_prefixes {
        check_prefix(&mut errors, "scope.excluded_prefixes", prefix);
    }

    // An empty substring matches every user agent.
    if config.deny_list.user_agents.iter().any(|ua| ua.trim().is_empty()) {
        errors.push(ValidationError::EmptyEntry("deny_list.user_agents"));
    }
    if config.deny_list.ips.iter().any(|ip| ip.trim().is_empty()) {
        errors.push(ValidationError::EmptyEntry("deny_list.ips"));
    }

    if config.security_headers.enabled {
        for (name, value) in &config.security_headers.values {
            let valid = HeaderName::from_bytes(name.as_bytes()).is_ok()
                && HeaderValue::from_str(value).is_ok();
            if !valid {
                errors.push(ValidationError::Header(name.clone()));
            }
        }
    }

    let size_limit = config.patterns.size_limit_bytes;
    for pattern in config.patterns.extra_sql.iter().chain(&config.patterns.extra_xss) {
        if let Err(e) = compile_pattern(pattern, size_limit) {
            errors.push(ValidationError::Pattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::Address {
            field,
            value: value.to_string(),
        });
    }
}

fn check_prefix(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if !value.starts_with('/') {
        errors.push(ValidationError::Prefix {
            field,
            value: value.to_string(),
        });
    }
}

//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gatekeeper.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the gatekeeper.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatekeeperConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Application that admitted requests are forwarded to.
    pub upstream: UpstreamConfig,

    /// Deployment environment. Controls diagnostic headers and log format.
    pub environment: Environment,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Static deny-lists.
    pub deny_list: DenyListConfig,

    /// Header validation limits.
    pub headers: HeaderRulesConfig,

    /// Operator-supplied threat patterns.
    pub patterns: PatternConfig,

    /// Which paths the gatekeeper applies to.
    pub scope: ScopeConfig,

    /// Static security headers added to responses.
    pub security_headers: SecurityHeadersConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admin API settings.
    pub admin: AdminConfig,

    /// Behavior when a check faults internally.
    pub fault_policy: FaultPolicy,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    pub fn is_production(self) -> bool {
        self == Environment::Production
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// What to do when a check cannot reach a verdict.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FaultPolicy {
    /// Log the fault, skip the failing check and keep evaluating.
    #[default]
    FailOpen,
    /// Reject the request with 503.
    FailClosed,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests admitted per (client, method) in one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// How often expired windows are purged from the store, in seconds.
    pub sweep_interval_secs: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 100,
            window_secs: 15 * 60,
            sweep_interval_secs: 60,
        }
    }
}

/// Static deny-lists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DenyListConfig {
    /// Exact client IPs.
    pub ips: Vec<String>,

    /// Case-insensitive user-agent substrings.
    pub user_agents: Vec<String>,

    /// Path prefixes.
    pub paths: Vec<String>,
}

impl Default for DenyListConfig {
    fn default() -> Self {
        Self {
            ips: Vec::new(),
            user_agents: [
                "bot",
                "crawler",
                "spider",
                "scraper",
                "curl",
                "wget",
                "python-requests",
                "python-urllib",
                "go-http-client",
                "libwww-perl",
                "httpclient",
                "okhttp",
                "scrapy",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            paths: [
                "/admin",
                "/.env",
                "/.git",
                "/config",
                "/wp-admin",
                "/wp-login",
                "/phpmyadmin",
                "/server-status",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Header validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HeaderRulesConfig {
    /// Ceiling on the summed length of every header name and value.
    pub max_total_bytes: usize,

    /// Path namespace under which `text/html` request bodies are accepted.
    pub api_prefix: String,
}

impl Default for HeaderRulesConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: 8192,
            api_prefix: "/api/".to_string(),
        }
    }
}

/// Extra threat patterns appended to the built-in libraries.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PatternConfig {
    /// Additional SQL-injection regexes.
    pub extra_sql: Vec<String>,

    /// Additional XSS regexes.
    pub extra_xss: Vec<String>,

    /// Maximum compiled size of a single pattern in bytes.
    pub size_limit_bytes: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            extra_sql: Vec::new(),
            extra_xss: Vec::new(),
            size_limit_bytes: 256 * 1024,
        }
    }
}

/// Which requests the gatekeeper inspects.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScopeConfig {
    /// Path prefixes that bypass the gatekeeper entirely.
    pub excluded_prefixes: Vec<String>,
}

impl Default for ScopeConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: ["/_static/", "/assets/", "/favicon.ico", "/robots.txt"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Static response headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// Enable security headers.
    pub enabled: bool,

    /// Header name to value.
    pub values: BTreeMap<String, String>,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        let values = [
            ("x-content-type-options", "nosniff"),
            ("x-frame-options", "DENY"),
            ("referrer-policy", "strict-origin-when-cross-origin"),
            ("x-xss-protection", "1; mode=block"),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            enabled: true,
            values,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

/// Placeholder key; validation refuses to start the admin API with it.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_policy() {
        let config = GatekeeperConfig::default();
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(900));
        assert_eq!(config.headers.max_total_bytes, 8192);
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.fault_policy, FaultPolicy::FailOpen);
        assert!(config.deny_list.paths.iter().any(|p| p == "/.env"));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: GatekeeperConfig = toml::from_str(
            r#"
            environment = "production"
            fault_policy = "fail_closed"

            [rate_limit]
            max_requests = 5

            [deny_list]
            ips = ["10.0.0.1"]
            "#,
        )
        .unwrap();

        assert!(config.environment.is_production());
        assert_eq!(config.fault_policy, FaultPolicy::FailClosed);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 900);
        assert_eq!(config.deny_list.ips, vec!["10.0.0.1".to_string()]);
        // Omitted lists inside a present section fall back to the section default.
        assert!(!config.deny_list.user_agents.is_empty());
    }
}

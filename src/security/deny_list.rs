//! Static deny-lists: client IPs, user-agent signatures, path prefixes.
//!
//! # Design Decisions
//! - Lists are built once from config and never mutated
//! - User-agent signatures are lowercased at build time; the request side is
//!   lowercased once per check
//! - Paths match by prefix, so `/admin` also covers `/admin/users`
//! - Path prefixes are canonicalized at build time and compared against the
//!   request's canonical path, so encoded, doubled-slash and upper-case
//!   spellings of a blocked prefix are still blocked

use std::collections::HashSet;

use crate::config::DenyListConfig;
use crate::routing::canonical_path;
use crate::security::DenyReason;

/// Immutable deny-lists.
#[derive(Debug, Clone, Default)]
pub struct DenyList {
    ips: HashSet<String>,
    user_agents: Vec<String>,
    paths: Vec<String>,
}

impl DenyList {
    pub fn new<I, U, P>(ips: I, user_agents: U, paths: P) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
        U: IntoIterator,
        U::Item: AsRef<str>,
        P: IntoIterator,
        P::Item: AsRef<str>,
    {
        Self {
            ips: ips.into_iter().map(Into::into).collect(),
            user_agents: user_agents
                .into_iter()
                .map(|ua| ua.as_ref().to_lowercase())
                .collect(),
            paths: paths
                .into_iter()
                .map(|p| canonical_path(p.as_ref()))
                .collect(),
        }
    }

    pub fn from_config(config: &DenyListConfig) -> Self {
        Self::new(
            config.ips.iter().map(|ip| ip.trim().to_string()),
            &config.user_agents,
            &config.paths,
        )
    }

    pub fn is_blocked(&self, ip: &str, user_agent: &str, path: &str) -> bool {
        self.classify(ip, user_agent, path).is_some()
    }

    /// Which list, if any, rejects this request. `path` must be canonical.
    pub fn classify(&self, ip: &str, user_agent: &str, path: &str) -> Option<DenyReason> {
        if self.is_blocked_ip(ip) {
            return Some(DenyReason::BlockedIp);
        }
        if self.is_blocked_user_agent(user_agent) {
            return Some(DenyReason::BlockedUserAgent);
        }
        if self.is_blocked_path(path) {
            return Some(DenyReason::BlockedPath);
        }
        None
    }

    pub fn is_blocked_ip(&self, ip: &str) -> bool {
        self.ips.contains(ip)
    }

    pub fn is_blocked_user_agent(&self, user_agent: &str) -> bool {
        if user_agent.is_empty() {
            return false;
        }
        let ua = user_agent.to_lowercase();
        self.user_agents.iter().any(|sig| ua.contains(sig.as_str()))
    }

    /// `path` is the output of `canonical_path`.
    pub fn is_blocked_path(&self, path: &str) -> bool {
        self.paths.iter().any(|prefix| path.starts_with(prefix.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deny_list() -> DenyList {
        DenyList::from_config(&DenyListConfig {
            ips: vec!["10.0.0.66".into()],
            ..DenyListConfig::default()
        })
    }

    const BROWSER: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/128.0";

    #[test]
    fn test_ip_exact_match() {
        let list = deny_list();
        assert_eq!(
            list.classify("10.0.0.66", BROWSER, "/"),
            Some(DenyReason::BlockedIp)
        );
        assert!(!list.is_blocked("10.0.0.6", BROWSER, "/"));
        assert!(!list.is_blocked("10.0.0.660", BROWSER, "/"));
    }

    #[test]
    fn test_user_agent_substring_case_insensitive() {
        let list = deny_list();
        assert!(list.is_blocked_user_agent("curl/8.0"));
        assert!(list.is_blocked_user_agent("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(list.is_blocked_user_agent("Python-Requests/2.31"));
        assert!(list.is_blocked_user_agent("SomeCRAWLER"));
        assert!(!list.is_blocked_user_agent(BROWSER));
    }

    #[test]
    fn test_missing_user_agent_does_not_block() {
        assert!(!deny_list().is_blocked("127.0.0.1", "", "/dashboard"));
    }

    #[test]
    fn test_path_prefix_covers_nested_paths() {
        let list = deny_list();
        assert!(list.is_blocked_path("/admin"));
        assert!(list.is_blocked_path("/admin/users"));
        assert!(list.is_blocked_path("/.env"));
        assert!(list.is_blocked_path("/.git/config"));
        assert!(!list.is_blocked_path("/my-admin-page"));
        assert!(!list.is_blocked_path("/dashboard"));
    }

    #[test]
    fn test_path_spellings_are_canonicalized() {
        let list = deny_list();
        for raw in [
            "/%2eenv",
            "/%61dmin",
            "//admin",
            "/ADMIN",
            "/Admin/Users",
            "/assets/../.env",
            "/assets/%2e%2e/.git/config",
            "/%252eenv",
        ] {
            assert!(list.is_blocked_path(&canonical_path(raw)), "{raw}");
        }
        assert!(!list.is_blocked_path(&canonical_path("/my-admin-page")));
        assert!(!list.is_blocked_path(&canonical_path("/My-Admin-Page")));
    }

    #[test]
    fn test_configured_paths_are_canonicalized() {
        let list = DenyList::new(
            Vec::<String>::new(),
            Vec::<String>::new(),
            ["/Internal//Reports"],
        );
        assert!(list.is_blocked_path(&canonical_path("/internal/reports/2024")));
    }

    #[test]
    fn test_classify_reports_first_matching_list() {
        let list = deny_list();
        assert_eq!(
            list.classify("10.0.0.66", "curl/8.0", "/admin"),
            Some(DenyReason::BlockedIp)
        );
        assert_eq!(
            list.classify("1.2.3.4", "curl/8.0", "/admin"),
            Some(DenyReason::BlockedUserAgent)
        );
        assert_eq!(
            list.classify("1.2.3.4", BROWSER, "/admin"),
            Some(DenyReason::BlockedPath)
        );
        assert_eq!(list.classify("1.2.3.4", BROWSER, "/dashboard"), None);
    }
}

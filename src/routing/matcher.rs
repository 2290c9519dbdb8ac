//! Path matching for the gatekeeper scope.
//!
//! # Design Decisions
//! - Matchers compare canonical paths; `Scope` canonicalizes its prefixes at
//!   build time and expects callers to pass `canonical_path` output
//! - An empty exclusion list means every request is inspected

use crate::config::ScopeConfig;
use crate::routing::path::canonical_path;

/// Trait for matching request paths against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the path matches this condition.
    fn matches(&self, path: &str) -> bool;
}

/// Matches the request path prefix.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Matcher for PathPrefixMatcher {
    fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.prefix)
    }
}

/// Which requests the gatekeeper inspects.
#[derive(Debug, Default)]
pub struct Scope {
    excluded: Vec<Box<dyn Matcher>>,
}

impl Scope {
    pub fn new(excluded: Vec<Box<dyn Matcher>>) -> Self {
        Self { excluded }
    }

    pub fn from_config(config: &ScopeConfig) -> Self {
        Self::new(
            config
                .excluded_prefixes
                .iter()
                .map(|p| Box::new(PathPrefixMatcher::new(canonical_path(p))) as Box<dyn Matcher>)
                .collect(),
        )
    }

    /// True when the gatekeeper should inspect this canonical path.
    pub fn includes(&self, path: &str) -> bool {
        !self.excluded.iter().any(|m| m.matches(path))
    }
}

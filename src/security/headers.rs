//! Request header validation.
//!
//! # Responsibilities
//! - Enforce a ceiling on total header bytes (names + values)
//! - Reject values carrying raw CR/LF (header injection)
//! - Reject `text/html` request bodies outside the API namespace
//!
//! # Design Decisions
//! - Pure function of the headers and the canonical path; the API prefix is
//!   canonicalized at build time
//! - Fail fast: checks run in the order above and stop at the first failure

use axum::http::{header, HeaderMap};
use thiserror::Error;

use crate::config::HeaderRulesConfig;
use crate::routing::canonical_path;
use crate::security::DenyReason;

/// Why a header set was rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HeaderViolation {
    #[error("headers total {total} bytes, limit is {limit}")]
    TooLarge { total: usize, limit: usize },

    #[error("header {0} contains a line break")]
    LineBreak(String),

    #[error("text/html content-type outside the API namespace")]
    HtmlContentType,
}

impl HeaderViolation {
    pub fn reason(&self) -> DenyReason {
        match self {
            HeaderViolation::TooLarge { .. } => DenyReason::HeadersTooLarge,
            HeaderViolation::LineBreak(_) => DenyReason::HeaderInjection,
            HeaderViolation::HtmlContentType => DenyReason::SuspiciousContentType,
        }
    }
}

/// Header rules fixed at startup.
#[derive(Debug, Clone)]
pub struct HeaderRules {
    pub max_total_bytes: usize,
    pub api_prefix: String,
}

impl HeaderRules {
    pub fn from_config(config: &HeaderRulesConfig) -> Self {
        Self {
            max_total_bytes: config.max_total_bytes,
            api_prefix: canonical_path(&config.api_prefix),
        }
    }

    /// Validate a parsed header map against a canonical path.
    pub fn validate_headers(&self, headers: &HeaderMap, path: &str) -> Result<(), HeaderViolation> {
        let pairs: Vec<(&str, &[u8])> = headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_bytes()))
            .collect();
        self.validate_header_pairs(pairs.iter().copied(), path)
    }

    /// Validate raw `(name, value)` pairs.
    pub fn validate_header_pairs<'a, I>(&self, pairs: I, path: &str) -> Result<(), HeaderViolation>
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])> + Clone,
    {
        let total: usize = pairs
            .clone()
            .into_iter()
            .map(|(name, value)| name.len() + value.len())
            .sum();
        if total > self.max_total_bytes {
            return Err(HeaderViolation::TooLarge {
                total,
                limit: self.max_total_bytes,
            });
        }

        if let Some((name, _)) = pairs
            .clone()
            .into_iter()
            .find(|(_, value)| value.iter().any(|b| *b == b'\n' || *b == b'\r'))
        {
            return Err(HeaderViolation::LineBreak(name.to_string()));
        }

        let html_body = pairs.into_iter().any(|(name, value)| {
            name.eq_ignore_ascii_case(header::CONTENT_TYPE.as_str())
                && String::from_utf8_lossy(value)
                    .to_ascii_lowercase()
                    .contains("text/html")
        });
        if html_body && !path.starts_with(self.api_prefix.as_str()) {
            return Err(HeaderViolation::HtmlContentType);
        }

        Ok(())
    }
}

impl Default for HeaderRules {
    fn default() -> Self {
        Self::from_config(&HeaderRulesConfig::default())
    }
}

//! Threat pattern libraries for query parameters.
//!
//! # Responsibilities
//! - Hold the SQL-injection and XSS pattern sets
//! - Scan every query (key, value) pair; any match on either side rejects
//!
//! # Design Decisions
//! - Patterns compile with the `regex` crate: finite automata, linear in the
//!   input, no backtracking, so hostile query strings cannot stall a request
//! - Every pattern, built-in or configured, goes through a size-limited
//!   builder
//! - Blunt and false-positive tolerant; this is a perimeter filter, not a
//!   replacement for parameterized queries or output encoding

use regex::{Regex, RegexBuilder};

use crate::config::PatternConfig;
use crate::security::DenyReason;

/// Category of a threat pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreatKind {
    SqlInjection,
    Xss,
}

impl ThreatKind {
    pub fn reason(self) -> DenyReason {
        match self {
            ThreatKind::SqlInjection => DenyReason::SqlInjection,
            ThreatKind::Xss => DenyReason::Xss,
        }
    }
}

/// A named, compiled pattern.
#[derive(Debug, Clone)]
pub struct ThreatPattern {
    pub name: String,
    pub kind: ThreatKind,
    regex: Regex,
}

impl ThreatPattern {
    pub fn is_match(&self, input: &str) -> bool {
        self.regex.is_match(input)
    }
}

const SQL_PATTERNS: &[(&str, &str)] = &[
    (
        "sql_keyword",
        r"(?i)\b(select|insert|update|delete|drop|create|alter|exec|execute)\b",
    ),
    ("sql_structural", r"(?i)\b(union|join|where|or|and)\b"),
    ("sql_metacharacter", r#"(--|;|/\*|\*/|'|")"#),
    ("sql_encoded", r"(?i)(%27|%22|%3b|%2d%2d|%23|%2f%2a)"),
];

const XSS_PATTERNS: &[(&str, &str)] = &[
    ("xss_script_tag", r"(?i)<\s*script\b"),
    ("xss_iframe_tag", r"(?i)<\s*iframe\b"),
    ("xss_javascript_uri", r"(?i)javascript\s*:"),
    ("xss_event_handler", r"(?i)\bon[a-z]+\s*="),
    ("xss_tag_with_handler", r"(?i)<[a-z][^>]*\son[a-z]+\s*="),
    ("xss_tag_with_javascript", r"(?i)<[a-z][^>]*javascript\s*:"),
];

/// Compile one pattern under the size ceiling.
pub fn compile_pattern(pattern: &str, size_limit: usize) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern)
        .size_limit(size_limit)
        .dfa_size_limit(size_limit)
        .build()
}

/// The SQL and XSS pattern sets.
#[derive(Debug, Clone)]
pub struct PatternLibrary {
    sql: Vec<ThreatPattern>,
    xss: Vec<ThreatPattern>,
}

impl PatternLibrary {
    /// Built-in patterns plus any configured extras.
    pub fn from_config(config: &PatternConfig) -> Result<Self, regex::Error> {
        let limit = config.size_limit_bytes;
        let mut sql = compile_set(ThreatKind::SqlInjection, SQL_PATTERNS, limit)?;
        let mut xss = compile_set(ThreatKind::Xss, XSS_PATTERNS, limit)?;

        for (i, pattern) in config.extra_sql.iter().enumerate() {
            sql.push(ThreatPattern {
                name: format!("sql_custom_{i}"),
                kind: ThreatKind::SqlInjection,
                regex: compile_pattern(pattern, limit)?,
            });
        }
        for (i, pattern) in config.extra_xss.iter().enumerate() {
            xss.push(ThreatPattern {
                name: format!("xss_custom_{i}"),
                kind: ThreatKind::Xss,
                regex: compile_pattern(pattern, limit)?,
            });
        }

        Ok(Self { sql, xss })
    }

    pub fn builtin() -> Result<Self, regex::Error> {
        Self::from_config(&PatternConfig::default())
    }

    pub fn contains_sql_injection<K, V>(&self, params: &[(K, V)]) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        scan(&self.sql, params).is_some()
    }

    pub fn contains_xss<K, V>(&self, params: &[(K, V)]) -> bool
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        scan(&self.xss, params).is_some()
    }

    /// First pattern of `kind` matching any key or value.
    pub fn first_match<K, V>(&self, kind: ThreatKind, params: &[(K, V)]) -> Option<&ThreatPattern>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        match kind {
            ThreatKind::SqlInjection => scan(&self.sql, params),
            ThreatKind::Xss => scan(&self.xss, params),
        }
    }

    pub fn len(&self) -> usize {
        self.sql.len() + self.xss.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn compile_set(
    kind: ThreatKind,
    definitions: &[(&str, &str)],
    limit: usize,
) -> Result<Vec<ThreatPattern>, regex::Error> {
    definitions
        .iter()
        .map(|(name, pattern)| {
            Ok(ThreatPattern {
                name: name.to_string(),
                kind,
                regex: compile_pattern(pattern, limit)?,
            })
        })
        .collect()
}

fn scan<'p, K, V>(patterns: &'p [ThreatPattern], params: &[(K, V)]) -> Option<&'p ThreatPattern>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    params.iter().find_map(|(key, value)| {
        patterns
            .iter()
            .find(|p| p.is_match(key.as_ref()) || p.is_match(value.as_ref()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> PatternLibrary {
        PatternLibrary::builtin().unwrap()
    }

    fn one(key: &str, value: &str) -> Vec<(String, String)> {
        vec![(key.to_string(), value.to_string())]
    }

    #[test]
    fn test_tautology_is_sql_injection() {
        let lib = library();
        assert!(lib.contains_sql_injection(&one("q", "' OR '1'='1")));
        assert!(!lib.contains_xss(&one("q", "' OR '1'='1")));
    }

    #[test]
    fn test_script_tag_is_xss() {
        let lib = library();
        assert!(lib.contains_xss(&one("q", "<script>alert(1)</script>")));
        assert_eq!(
            lib.first_match(ThreatKind::Xss, &one("q", "<script>alert(1)</script>"))
                .map(|p| p.name.as_str()),
            Some("xss_script_tag")
        );
    }

    #[test]
    fn test_plain_text_passes_both() {
        let lib = library();
        let params = one("q", "hello world");
        assert!(!lib.contains_sql_injection(&params));
        assert!(!lib.contains_xss(&params));

        // Keywords only match as whole words.
        let params = one("city", "Portland");
        assert!(!lib.contains_sql_injection(&params));
    }

    #[test]
    fn test_key_is_scanned_too() {
        let lib = library();
        assert!(lib.contains_sql_injection(&one("id;drop", "1")));
        assert!(lib.contains_xss(&one("<iframe src=x>", "1")));
    }

    #[test]
    fn test_any_pair_triggers() {
        let lib = library();
        let params = vec![
            ("page".to_string(), "2".to_string()),
            ("sort".to_string(), "name".to_string()),
            ("filter".to_string(), "1 UNION SELECT password".to_string()),
        ];
        assert!(lib.contains_sql_injection(&params));
    }

    #[test]
    fn test_encoded_obfuscation() {
        let lib = library();
        assert_eq!(
            lib.first_match(ThreatKind::SqlInjection, &one("q", "abc%27"))
                .map(|p| p.name.as_str()),
            Some("sql_encoded")
        );
    }

    #[test]
    fn test_xss_variants() {
        let lib = library();
        assert!(lib.contains_xss(&one("next", "javascript:alert(1)")));
        assert!(lib.contains_xss(&one("q", "<img src=x onerror=alert(1)>")));
        assert!(lib.contains_xss(&one("q", "<a href='JavaScript:void(0)'>")));
        assert!(lib.contains_xss(&one("q", "onload = steal()")));
        assert!(!lib.contains_xss(&one("q", "onion rings")));
    }

    #[test]
    fn test_extra_patterns_are_appended() {
        let config = PatternConfig {
            extra_sql: vec![r"(?i)sleep\s*\(".into()],
            ..PatternConfig::default()
        };
        let lib = PatternLibrary::from_config(&config).unwrap();
        assert_eq!(lib.len(), library().len() + 1);
        assert_eq!(
            lib.first_match(ThreatKind::SqlInjection, &one("q", "SLEEP (5)"))
                .map(|p| p.name.as_str()),
            Some("sql_custom_0")
        );
    }

    #[test]
    fn test_oversized_pattern_rejected() {
        assert!(compile_pattern(r"\w{1000}\w{1000}", 1024).is_err());
    }

    #[test]
    fn test_long_hostile_input_scans() {
        let lib = library();
        let hostile = "a".repeat(64 * 1024) + "<";
        assert!(!lib.contains_xss(&one("q", &hostile)));
    }
}

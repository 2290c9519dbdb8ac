//! Canonical request paths for matching.
//!
//! Every matcher (scope, deny-list, API namespace) compares against the same
//! canonical form, so `/%2eenv`, `//admin`, `/ADMIN` and `/assets/../.env`
//! land on the prefixes they spell.
//!
//! # Design Decisions
//! - Percent-decoding repeats until the path stops changing (bounded), which
//!   folds double-encoded input like `%252e`
//! - Dot segments are resolved the way RFC 3986 `remove_dot_segments` does;
//!   `..` never climbs above the root
//! - Empty segments are dropped, which collapses repeated `/`
//! - The result is lowercased; invalid UTF-8 is replaced, not rejected
//! - The forwarded request keeps its raw path; only matching sees this form

use std::borrow::Cow;

const MAX_DECODE_ROUNDS: usize = 4;

/// Canonical, lowercased form of a request path.
pub fn canonical_path(raw: &str) -> String {
    let decoded = decode_fully(raw);

    let mut segments: Vec<&str> = Vec::new();
    let mut trailing_slash = false;
    for segment in decoded.split('/') {
        trailing_slash = matches!(segment, "" | "." | "..");
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    let mut path = String::with_capacity(decoded.len() + 1);
    for segment in &segments {
        path.push('/');
        path.push_str(segment);
    }
    if path.is_empty() || trailing_slash {
        path.push('/');
    }
    path.to_lowercase()
}

fn decode_fully(raw: &str) -> Cow<'_, str> {
    let mut current = Cow::Borrowed(raw);
    for _ in 0..MAX_DECODE_ROUNDS {
        if !current.contains('%') {
            break;
        }
        let decoded =
            String::from_utf8_lossy(&urlencoding::decode_binary(current.as_bytes())).into_owned();
        if decoded == current {
            break;
        }
        current = Cow::Owned(decoded);
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_paths_are_unchanged() {
        assert_eq!(canonical_path("/"), "/");
        assert_eq!(canonical_path("/dashboard"), "/dashboard");
        assert_eq!(canonical_path("/assets/"), "/assets/");
        assert_eq!(canonical_path("/.env"), "/.env");
        assert_eq!(canonical_path("/.git/config"), "/.git/config");
    }

    #[test]
    fn test_percent_encoding_is_decoded() {
        assert_eq!(canonical_path("/%2eenv"), "/.env");
        assert_eq!(canonical_path("/%61dmin"), "/admin");
        assert_eq!(canonical_path("/%252eenv"), "/.env");
        assert_eq!(canonical_path("/admin%2Fusers"), "/admin/users");
    }

    #[test]
    fn test_repeated_slashes_collapse() {
        assert_eq!(canonical_path("//admin"), "/admin");
        assert_eq!(canonical_path("/admin///users"), "/admin/users");
        assert_eq!(canonical_path(""), "/");
    }

    #[test]
    fn test_case_is_folded() {
        assert_eq!(canonical_path("/ADMIN"), "/admin");
        assert_eq!(canonical_path("/Wp-Login.php"), "/wp-login.php");
    }

    #[test]
    fn test_dot_segments_are_resolved() {
        assert_eq!(canonical_path("/assets/../.env"), "/.env");
        assert_eq!(canonical_path("/assets/%2e%2e/.env"), "/.env");
        assert_eq!(canonical_path("/assets/..%2fadmin/users"), "/admin/users");
        assert_eq!(canonical_path("/./admin"), "/admin");
        assert_eq!(canonical_path("/a/b/./../c"), "/a/c");
        assert_eq!(canonical_path("/assets/."), "/assets/");
    }

    #[test]
    fn test_dot_segments_stop_at_root() {
        assert_eq!(canonical_path("/../../.env"), "/.env");
        assert_eq!(canonical_path("/.."), "/");
    }

    #[test]
    fn test_dots_inside_names_are_kept() {
        assert_eq!(canonical_path("/files/..hidden"), "/files/..hidden");
        assert_eq!(canonical_path("/v1.2/app.js"), "/v1.2/app.js");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        assert_eq!(canonical_path("/%ff/admin"), "/\u{fffd}/admin");
    }
}

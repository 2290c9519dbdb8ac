//! Gatekeeper scope.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → path.rs (canonical form: decoded, dot segments resolved, lowercased)
//!     → matcher.rs (excluded prefix matchers)
//!     → in scope: run the security chain
//!     → out of scope: pass straight to the application
//! ```
//!
//! # Design Decisions
//! - Scope is compiled at startup, immutable at runtime
//! - No regex in the hot path (prefix matching only)
//! - The default scope is broad: everything except static assets

pub mod matcher;
pub mod path;

pub use matcher::{Matcher, PathPrefixMatcher, Scope};
pub use path::canonical_path;

//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → identity.rs (resolve client IP, user agent)
//!     → deny_list.rs (blocked IP / user agent / path → 403)
//!     → rate_limit.rs (fixed window per client + method → 429)
//!     → headers.rs (size, CR/LF, content-type → 400)
//!     → patterns.rs (SQL / XSS in query pairs → 400)
//!     → Admit, pass to the application
//! ```
//!
//! # Design Decisions
//! - Each stage is a `SecurityCheck`; the gatekeeper reduces over an ordered
//!   list and stops at the first terminal verdict
//! - Denials never tell the client which rule fired; the reason is logged
//! - Only the rate-limit store is mutable; everything else is built at startup

pub mod checks;
pub mod clock;
pub mod decision;
pub mod deny_list;
pub mod gatekeeper;
pub mod headers;
pub mod identity;
pub mod middleware;
pub mod patterns;
pub mod rate_limit;
pub mod store;

pub use checks::{CheckError, SecurityCheck, Verdict};
pub use clock::{Clock, ManualClock, SystemClock};
pub use decision::{DenyReason, SecurityDecision};
pub use deny_list::DenyList;
pub use gatekeeper::{Gatekeeper, GatekeeperError};
pub use headers::{HeaderRules, HeaderViolation};
pub use middleware::gatekeeper_middleware;
pub use patterns::{PatternLibrary, ThreatKind, ThreatPattern};
pub use rate_limit::{RateLimitStatus, RateLimiter};
pub use store::{ClientKey, MemoryWindowStore, RateWindow, StoreError, WindowStore};

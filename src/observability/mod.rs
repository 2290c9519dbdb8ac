//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gatekeeper / proxy handler
//!     → logging.rs (structured events carrying the request ID)
//!     → metrics.rs (decision counters, upstream latency)
//!
//! Consumers:
//!     → stdout (JSON in production)
//!     → Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;

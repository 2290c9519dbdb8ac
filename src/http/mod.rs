//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, timeout, tracing)
//!     → security::middleware (gatekeeper decision)
//!         deny → response.rs (uniform JSON denial)
//!         admit → request.rs (request ID attached)
//!     → server.rs proxy handler (forward upstream)
//!     → response.rs (correlation, quota, timing headers)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestContext, RequestId, RequestIdExt, X_REQUEST_ID};
pub use response::DenialBody;
pub use server::{protect, HttpServer, ServerError};

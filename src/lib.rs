//! Request-time security gatekeeper.
//!
//! Deny-lists, fixed-window rate limiting, header validation and query
//! pattern scanning in front of an HTTP application, usable as an Axum
//! middleware (`http::protect`) or as a standalone reverse proxy
//! (`http::HttpServer`).

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::schema::GatekeeperConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use security::{Gatekeeper, SecurityDecision};

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatekeeperConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is fixed at startup; there is no hot reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, DenyListConfig, Environment, FaultPolicy, GatekeeperConfig, HeaderRulesConfig,
    ListenerConfig, ObservabilityConfig, PatternConfig, RateLimitConfig, ScopeConfig,
    SecurityHeadersConfig, TimeoutConfig, UpstreamConfig,
};

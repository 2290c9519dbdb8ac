//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGINT / SIGTERM → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     broadcast → proxy server, admin server, window sweeper stop
//!
//! Sweeper (sweeper.rs):
//!     every interval → purge expired rate-limit windows
//! ```

pub mod shutdown;
pub mod signals;
pub mod sweeper;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
pub use sweeper::WindowSweeper;

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Sync backends → Start loops → Accept
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → Drain connections → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then registry/selector, then loops
//! - Graceful drain is the default: only health-driven disablement or idle
//!   timeout terminates in-flight forwarding

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

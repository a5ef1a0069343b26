//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer
//!     → snapshot registry
//!     → probe each backend (bare TCP connect, bounded)
//!     → on transition: flip healthy flag, log
//!         unhealthy → mark_inactive (disable + cancel in-flight handlers)
//!         healthy   → mark_active (re-enable, counters untouched)
//! ```
//!
//! # Design Decisions
//! - A probe succeeds iff a connection is established within the timeout
//! - Only transitions are acted on; steady state is silent
//! - One backend's failure never stops the pass or the loop

pub mod monitor;

pub use monitor::HealthMonitor;

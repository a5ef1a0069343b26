//! Networking subsystem.
//!
//! # Data Flow
//! ```text
//! listener.rs (accept, bounded)
//!     → Selector::next_backend()
//!     → handler.rs (connect, then bidirectional copy with idle timeout)
//!     → counter increment/decrement on the chosen BackendStatus
//! ```
//!
//! # Design Decisions
//! - One task per connection; a stuck connection never blocks accept
//! - NoHealthyBackend closes the client and keeps the loop alive
//! - Shutdown stops accepting but drains in-flight handlers gracefully

pub mod handler;
pub mod listener;

pub use handler::ConnectionHandler;
pub use listener::{Acceptor, ListenerError};

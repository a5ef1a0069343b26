//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BalancerConfig (validated)
//!     → stored in ArcSwap, read by all subsystems
//!
//! On reload:
//!     watcher.rs detects change
//!     → loader.rs loads + validates new config
//!     → atomic swap of Arc<BalancerConfig>
//!     → backend sync reconciles the desired endpoint list
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a full reload
//! - All fields have defaults to allow minimal configs
//! - An invalid reload is rejected and the current config kept
//! - The idle timeout is read from the live handle per connection, so a
//!   reload affects connections accepted after it

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::BalancerConfig;
pub use watcher::ConfigWatcher;

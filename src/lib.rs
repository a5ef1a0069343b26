//! TCP-level load balancer library.

pub mod balancer;
pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod status;

pub use balancer::{BackendEndpoint, BackendRegistry, BackendStatus, SelectError, Selector};
pub use config::BalancerConfig;
pub use health::HealthMonitor;
pub use lifecycle::Shutdown;
pub use net::Acceptor;
pub use status::{StatusFileWriter, StatusSnapshot};

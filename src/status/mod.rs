//! Status export subsystem.
//!
//! # Data Flow
//! ```text
//! BackendRegistry::snapshot()
//!     → StatusSnapshot (serializable, point-in-time)
//!     → writer.rs (periodic pretty JSON to disk)
//! ```
//!
//! # Design Decisions
//! - The snapshot is a copy: readers never hold registry state
//! - Write failures are warnings, never fatal

pub mod writer;

pub use writer::StatusFileWriter;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::balancer::BackendRegistry;

/// Point-in-time view of the whole registry.
#[derive(Debug, Serialize)]
pub struct StatusSnapshot {
    /// Seconds since the UNIX epoch at snapshot time.
    pub timestamp_unix: u64,
    /// Sum of active connections across all backends.
    pub active_connections: usize,
    pub backends: Vec<BackendSnapshot>,
}

/// Point-in-time view of one backend.
#[derive(Debug, Serialize)]
pub struct BackendSnapshot {
    pub endpoint: String,
    pub healthy: bool,
    pub enabled: bool,
    pub active_connections: usize,
}

impl StatusSnapshot {
    /// Capture the current registry state.
    pub fn capture(registry: &BackendRegistry) -> Self {
        let backends: Vec<BackendSnapshot> = registry
            .snapshot()
            .iter()
            .map(|b| BackendSnapshot {
                endpoint: b.endpoint.to_string(),
                healthy: b.is_healthy(),
                enabled: b.is_enabled(),
                active_connections: b.active_connections(),
            })
            .collect();

        Self {
            timestamp_unix: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            active_connections: backends.iter().map(|b| b.active_connections).sum(),
            backends,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::BackendEndpoint;

    #[test]
    fn snapshot_sums_active_connections() {
        let registry = BackendRegistry::new();
        registry.apply_desired(&[
            BackendEndpoint::new("127.0.0.1", 9001),
            BackendEndpoint::new("127.0.0.1", 9002),
        ]);
        let backends = registry.snapshot();
        let _a = backends[0].track_connection();
        let _b = backends[0].track_connection();
        let _c = backends[1].track_connection();

        let snapshot = StatusSnapshot::capture(&registry);
        assert_eq!(snapshot.active_connections, 3);
        assert_eq!(snapshot.backends.len(), 2);
        assert_eq!(snapshot.backends[0].endpoint, "127.0.0.1:9001");
        assert!(snapshot.backends[0].healthy);
        assert!(snapshot.timestamp_unix > 0);
    }
}

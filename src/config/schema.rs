//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML config files,
//! with defaults matching the shipped sample configuration.

use serde::{Deserialize, Serialize};

use crate::balancer::BackendEndpoint;

/// Root configuration for the balancer.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BalancerConfig {
    /// Selection strategy: RoundRobin, Random or LeastConnections.
    pub strategy: Strategy,

    /// Listener settings (bind address, connection limit).
    pub listener: ListenerConfig,

    /// Desired backend endpoints.
    pub backends: Vec<BackendEndpoint>,

    /// Health check settings.
    pub health_check: HealthCheckConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-connection socket options.
    pub socket: SocketConfig,

    /// Status file export settings.
    pub status: StatusConfig,
}

/// Backend selection strategy name.
///
/// Kept as a validated string rather than an enum so an unknown name
/// surfaces as a semantic validation error with the offending value, not a
/// serde parse failure.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Strategy(pub String);

impl Strategy {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Strategy {
    fn default() -> Self {
        Self("RoundRobin".to_string())
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9000").
    pub bind_address: String,

    /// Maximum concurrent connections (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9000".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Health check settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Seconds between probe passes.
    pub interval_secs: u64,

    /// Per-probe connect timeout in seconds.
    pub probe_timeout_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            interval_secs: 10,
            probe_timeout_secs: 3,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum silence on one forwarding direction before teardown.
    pub idle_secs: u64,

    /// Outbound backend connect timeout.
    pub connect_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 600,
            connect_secs: 10,
        }
    }
}

/// Socket options applied to both sides of a forwarded connection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Disable Nagle batching (TCP_NODELAY).
    pub nodelay: bool,

    /// Enable TCP keepalive probing so dead peers are detected even with no
    /// application traffic.
    pub keepalive: bool,
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            nodelay: true,
            keepalive: true,
        }
    }
}

/// Status file export settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Whether the periodic status file is written at all.
    pub enabled: bool,

    /// Where the JSON snapshot is written.
    pub file_path: String,

    /// Seconds between writes.
    pub interval_secs: u64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_path: "status/balancer-status.json".to_string(),
            interval_secs: 5,
        }
    }
}

//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate the strategy name before any traffic is accepted
//! - Validate value ranges (intervals > 0, parseable bind address)
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function over the parsed config
//! - Runs before a config is accepted, at startup and on reload

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::BalancerConfig;

const KNOWN_STRATEGIES: [&str; 3] = ["RoundRobin", "Random", "LeastConnections"];

/// A single semantic problem with a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown strategy {0:?} (expected RoundRobin, Random or LeastConnections)")]
    UnknownStrategy(String),
    #[error("invalid listen address {0:?}")]
    InvalidBindAddress(String),
    #[error("backend list is empty")]
    NoBackends,
    #[error("backend {0:?} has an empty host")]
    EmptyBackendHost(String),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// Check everything serde cannot. Collects every error so an operator can
/// fix a config in one pass.
pub fn validate_config(config: &BalancerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !KNOWN_STRATEGIES.contains(&config.strategy.as_str()) {
        errors.push(ValidationError::UnknownStrategy(
            config.strategy.as_str().to_string(),
        ));
    }

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.backends.is_empty() {
        errors.push(ValidationError::NoBackends);
    }
    for backend in &config.backends {
        if backend.host.is_empty() {
            errors.push(ValidationError::EmptyBackendHost(backend.to_string()));
        }
    }

    for (value, name) in [
        (config.health_check.interval_secs, "health_check.interval_secs"),
        (config.health_check.probe_timeout_secs, "health_check.probe_timeout_secs"),
        (config.timeouts.idle_secs, "timeouts.idle_secs"),
        (config.timeouts.connect_secs, "timeouts.connect_secs"),
        (config.status.interval_secs, "status.interval_secs"),
    ] {
        if value == 0 {
            errors.push(ValidationError::ZeroInterval(name));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

//! Backend selection subsystem.
//!
//! # Data Flow
//! ```text
//! Acceptor → Selector::next_backend()
//!     → snapshot working set (short-lived lock)
//!     → Apply selection strategy:
//!         - round_robin.rs (rotate through backends)
//!         - random.rs (uniform sample)
//!         - least_conn.rs (fewest active connections)
//!     → Arc<BackendStatus> or NoHealthyBackend
//!
//! Reconciliation → Selector::update_backends()
//!     → atomic swap of the working set
//! ```
//!
//! # Design Decisions
//! - Strategies are stateless apart from the round-robin cursor; they operate
//!   on a snapshot, so a concurrent swap can never invalidate a scan
//! - The lock guards the list, not its elements; per-backend counters are
//!   atomics on the hot path
//! - Ineligible (unhealthy or disabled) backends are skipped at pick time, so
//!   health transitions take effect without a working-set rebuild

use std::sync::{Arc, Mutex};

use thiserror::Error;

pub mod backend;
pub mod least_conn;
pub mod random;
pub mod registry;
pub mod round_robin;

pub use backend::{BackendEndpoint, BackendStatus, ConnectionGuard};
pub use registry::BackendRegistry;

use least_conn::LeastConnections;
use random::Random;
use round_robin::RoundRobin;

/// Selection failures.
#[derive(Debug, Error)]
pub enum SelectError {
    /// No backend is both healthy and enabled.
    #[error("no healthy backends available")]
    NoHealthyBackend,
    /// Strategy name not recognized at construction time.
    #[error("unknown backend selection strategy: {0}")]
    UnknownStrategy(String),
}

/// A selection strategy over a snapshot of the working set.
///
/// Returns `None` when no entry is eligible; the caller maps that to
/// [`SelectError::NoHealthyBackend`].
pub trait SelectionStrategy: Send + Sync + std::fmt::Debug {
    fn pick(&self, backends: &[Arc<BackendStatus>]) -> Option<Arc<BackendStatus>>;
}

/// Strategy plus the working set it selects over.
///
/// The working set is replaced wholesale by reconciliation; selection clones
/// the Arc list under the lock and releases it before running the strategy.
#[derive(Debug)]
pub struct Selector {
    backends: Mutex<Vec<Arc<BackendStatus>>>,
    strategy: Box<dyn SelectionStrategy>,
}

impl Selector {
    /// Build a selector from a configured strategy name.
    ///
    /// Fails with [`SelectError::UnknownStrategy`] for any name outside
    /// RoundRobin / Random / LeastConnections; callers treat that as fatal
    /// before accepting traffic.
    pub fn from_strategy_name(
        name: &str,
        backends: Vec<Arc<BackendStatus>>,
    ) -> Result<Self, SelectError> {
        let strategy: Box<dyn SelectionStrategy> = match name {
            "RoundRobin" => Box::new(RoundRobin::new()),
            "Random" => Box::new(Random::new()),
            "LeastConnections" => Box::new(LeastConnections::new()),
            other => return Err(SelectError::UnknownStrategy(other.to_string())),
        };
        Ok(Self {
            backends: Mutex::new(backends),
            strategy,
        })
    }

    /// Pick the next backend for a new connection.
    pub fn next_backend(&self) -> Result<Arc<BackendStatus>, SelectError> {
        let snapshot = self
            .backends
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        self.strategy
            .pick(&snapshot)
            .ok_or(SelectError::NoHealthyBackend)
    }

    /// Atomically replace the working set.
    pub fn update_backends(&self, backends: Vec<Arc<BackendStatus>>) {
        let mut guard = self
            .backends
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = backends;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(port: u16) -> Arc<BackendStatus> {
        Arc::new(BackendStatus::new(BackendEndpoint::new("127.0.0.1", port)))
    }

    #[test]
    fn unknown_strategy_is_rejected() {
        let err = Selector::from_strategy_name("WeightedMagic", Vec::new()).unwrap_err();
        assert!(matches!(err, SelectError::UnknownStrategy(name) if name == "WeightedMagic"));
    }

    #[test]
    fn known_strategies_construct() {
        for name in ["RoundRobin", "Random", "LeastConnections"] {
            assert!(Selector::from_strategy_name(name, Vec::new()).is_ok());
        }
    }

    #[test]
    fn empty_working_set_fails() {
        let selector = Selector::from_strategy_name("RoundRobin", Vec::new()).unwrap();
        assert!(matches!(
            selector.next_backend(),
            Err(SelectError::NoHealthyBackend)
        ));
    }

    #[test]
    fn selection_survives_working_set_swap() {
        let selector = Selector::from_strategy_name("RoundRobin", vec![status(9001), status(9002)])
            .unwrap();
        selector.next_backend().unwrap();

        // Shrink the working set; the cursor must stay valid.
        selector.update_backends(vec![status(9003)]);
        for _ in 0..5 {
            assert_eq!(selector.next_backend().unwrap().endpoint.port, 9003);
        }
    }

    #[test]
    fn eligible_backend_is_always_found() {
        let a = status(9001);
        a.set_healthy(false);
        let b = status(9002);
        let selector =
            Selector::from_strategy_name("LeastConnections", vec![a, Arc::clone(&b)]).unwrap();
        assert_eq!(selector.next_backend().unwrap().endpoint, b.endpoint);
    }
}

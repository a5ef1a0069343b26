//! Least Connections selection strategy.

use std::sync::Arc;

use crate::balancer::{backend::BackendStatus, SelectionStrategy};

/// Least connections selector.
/// Picks the eligible backend with the fewest active connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for LeastConnections {
    fn pick(&self, backends: &[Arc<BackendStatus>]) -> Option<Arc<BackendStatus>> {
        // Strict comparison keeps the first minimum, so ties break by list
        // order (min_by_key would keep the last).
        let mut best: Option<&Arc<BackendStatus>> = None;
        for backend in backends.iter().filter(|b| b.is_eligible()) {
            match best {
                Some(current) if current.active_connections() <= backend.active_connections() => {}
                _ => best = Some(backend),
            }
        }
        best.map(Arc::clone)
    }
}

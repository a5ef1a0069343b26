//! Uniform random selection strategy.

use std::sync::Arc;

use rand::seq::SliceRandom;

use crate::balancer::{backend::BackendStatus, SelectionStrategy};

/// Random selector.
/// Samples uniformly from the eligible subset.
#[derive(Debug, Default)]
pub struct Random;

impl Random {
    pub fn new() -> Self {
        Self
    }
}

impl SelectionStrategy for Random {
    fn pick(&self, backends: &[Arc<BackendStatus>]) -> Option<Arc<BackendStatus>> {
        let eligible: Vec<&Arc<BackendStatus>> =
            backends.iter().filter(|b| b.is_eligible()).collect();
        eligible
            .choose(&mut rand::thread_rng())
            .map(|b| Arc::clone(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::backend::BackendEndpoint;

    fn status(port: u16) -> Arc<BackendStatus> {
        Arc::new(BackendStatus::new(BackendEndpoint::new("127.0.0.1", port)))
    }

    #[test]
    fn never_picks_ineligible() {
        let lb = Random::new();
        let a = status(9001);
        let b = status(9002);
        let bad = status(9003);
        bad.set_healthy(false);
        let backends = vec![Arc::clone(&a), Arc::clone(&b), bad];

        for _ in 0..50 {
            let picked = lb.pick(&backends).unwrap();
            assert_ne!(picked.endpoint.port, 9003);
        }
    }

    #[test]
    fn fails_on_empty_eligible_set() {
        let lb = Random::new();
        assert!(lb.pick(&[]).is_none());

        let a = status(9001);
        a.disable();
        assert!(lb.pick(&[a]).is_none());
    }
}

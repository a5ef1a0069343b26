//! Round-robin selection strategy.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::balancer::{backend::BackendStatus, SelectionStrategy};

/// Round-robin selector.
/// Stores a monotonically increasing cursor shared across calls.
#[derive(Debug, Default)]
pub struct RoundRobin {
    cursor: AtomicUsize,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SelectionStrategy for RoundRobin {
    fn pick(&self, backends: &[Arc<BackendStatus>]) -> Option<Arc<BackendStatus>> {
        if backends.is_empty() {
            return None;
        }

        // The cursor advances once per scanned entry, so a skipped entry is
        // not revisited by the next call. Taking it modulo the current
        // length keeps it valid after the working set shrinks. Scan at most
        // one full lap so an all-ineligible list fails instead of spinning.
        let len = backends.len();
        for _ in 0..len {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
            let backend = &backends[index];
            if backend.is_eligible() {
                return Some(Arc::clone(backend));
            }
        }
        None
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
    fn wraps_around() {
        let lb = RoundRobin::new();
        let a = status(9001);
        let b = status(9002);
        let backends = vec![Arc::clone(&a), Arc::clone(&b)];

        assert_eq!(lb.pick(&backends).unwrap().endpoint, a.endpoint);
        assert_eq!(lb.pick(&backends).unwrap().endpoint, b.endpoint);
        assert_eq!(lb.pick(&backends).unwrap().endpoint, a.endpoint);
    }

    #[test]
    fn skips_unhealthy_without_double_counting() {
        let lb = RoundRobin::new();
        let a = status(9001);
        let bad = status(9002);
        bad.set_healthy(false);
        let b = status(9003);
        let backends = vec![Arc::clone(&a), bad, Arc::clone(&b)];

        assert_eq!(lb.pick(&backends).unwrap().endpoint, a.endpoint);
        assert_eq!(lb.pick(&backends).unwrap().endpoint, b.endpoint);
        assert_eq!(lb.pick(&backends).unwrap().endpoint, a.endpoint);
    }

    #[test]
    fn fails_when_all_ineligible() {
        let lb = RoundRobin::new();
        let a = status(9001);
        a.set_healthy(false);
        let b = status(9002);
        b.disable();
        assert!(lb.pick(&[a, b]).is_none());
    }
}

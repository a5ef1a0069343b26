//! Backend registry: the single owner of all [`BackendStatus`] instances.
//!
//! # Responsibilities
//! - Hold the live backend list behind a short-lived structural lock
//! - Reconcile a newly desired topology into the list (backend sync)
//! - Hand out snapshots to the selector, the health monitor and the
//!   status exporter

use std::sync::{Arc, Mutex};

use crate::balancer::backend::{BackendEndpoint, BackendStatus};

/// Shared-mutable backend list. The lock covers only structural operations
/// (reconciliation and snapshotting); per-element state is atomic.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: Mutex<Vec<Arc<BackendStatus>>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone the current list. The Arcs are shared, not copied, so callers
    /// observe live per-backend state.
    pub fn snapshot(&self) -> Vec<Arc<BackendStatus>> {
        self.lock().clone()
    }

    /// Merge a desired endpoint set into the registry.
    ///
    /// - new endpoints are appended healthy+enabled with zero connections
    /// - endpoints that left the desired set are disabled in place; their
    ///   in-flight connections drain naturally (no cancel broadcast)
    /// - endpoints present in both keep their health and counters; one that
    ///   was previously removed by topology and has come back is re-enabled
    ///
    /// Returns the enabled subset for [`Selector::update_backends`].
    ///
    /// [`Selector::update_backends`]: crate::balancer::Selector::update_backends
    pub fn apply_desired(&self, desired: &[BackendEndpoint]) -> Vec<Arc<BackendStatus>> {
        let mut backends = self.lock();

        for endpoint in desired {
            if !backends.iter().any(|b| &b.endpoint == endpoint) {
                tracing::info!(backend = %endpoint, "New backend added");
                backends.push(Arc::new(BackendStatus::new(endpoint.clone())));
            }
        }

        for backend in backends.iter() {
            let in_desired = desired.contains(&backend.endpoint);
            if !in_desired && backend.is_enabled() {
                // Graceful removal: eligibility only, no forced disconnect.
                backend.disable();
                tracing::info!(backend = %backend.endpoint, "Backend removed from topology, disabled");
            } else if in_desired && !backend.is_enabled() && backend.is_healthy() {
                // Came back in a later reload after a topology removal.
                // Health-disabled backends stay down until a probe passes.
                backend.mark_active();
                tracing::info!(backend = %backend.endpoint, "Backend rejoined topology, enabled");
            }
        }

        backends.iter().filter(|b| b.is_enabled()).cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Arc<BackendStatus>>> {
        self.backends
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

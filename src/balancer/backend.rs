//! Backend endpoint and live status.
//!
//! # Responsibilities
//! - Represent a single backend server (host:port identity)
//! - Track health and enablement flags
//! - Track active connections (lock-free, for Least Connections)
//! - Carry the per-backend cancellation channel used to force-terminate
//!   in-flight connections when the backend is marked inactive

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Address of a backend server. Identity is the (host, port) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct BackendEndpoint {
    pub host: String,
    pub port: u16,
}

impl BackendEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for BackendEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Live state of one backend, shared by the selector, the connection
/// handlers, the health monitor and the reconciler.
///
/// Flags are only written by the health monitor and the reconciler; the
/// connection counter is only touched by handlers via [`ConnectionGuard`].
#[derive(Debug)]
pub struct BackendStatus {
    /// The address of the backend.
    pub endpoint: BackendEndpoint,
    /// Last probe result. Written only by the health monitor.
    healthy: AtomicBool,
    /// Administrative eligibility. Written by the health monitor and the
    /// reconciler.
    enabled: AtomicBool,
    /// Number of currently open backend sockets for this status.
    active_connections: AtomicUsize,
    /// Cancellation channel for the current connection generation. Handlers
    /// subscribe at connect time; a send terminates every subscriber.
    /// Receivers subscribed after a send never observe it, so a plain send
    /// acts as a generation bump.
    cancel_tx: broadcast::Sender<()>,
}

impl BackendStatus {
    /// Create a new status. Backends start healthy and enabled, matching the
    /// reconciler's treatment of freshly added endpoints.
    pub fn new(endpoint: BackendEndpoint) -> Self {
        let (cancel_tx, _) = broadcast::channel(1);
        Self {
            endpoint,
            healthy: AtomicBool::new(true),
            enabled: AtomicBool::new(true),
            active_connections: AtomicUsize::new(0),
            cancel_tx,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Record a probe result. Health monitor only.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::Relaxed);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Eligible for selection: healthy and enabled.
    pub fn is_eligible(&self) -> bool {
        self.is_healthy() && self.is_enabled()
    }

    /// Get the current number of active connections.
    pub fn active_connections(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Subscribe to the current connection generation. A message on the
    /// returned receiver means this backend was marked inactive and the
    /// subscriber must stop forwarding.
    pub fn subscribe_cancel(&self) -> broadcast::Receiver<()> {
        self.cancel_tx.subscribe()
    }

    /// Zero the connection counter and cancel every in-flight handler bound
    /// to this backend.
    pub fn reset_connections(&self) {
        self.active_connections.store(0, Ordering::Relaxed);
        // No receivers is fine: nothing to cancel.
        let _ = self.cancel_tx.send(());
    }

    /// Health-driven disablement: the backend failed a probe and cannot be
    /// trusted to carry existing traffic.
    pub fn mark_inactive(&self) {
        self.enabled.store(false, Ordering::Relaxed);
        self.reset_connections();
    }

    /// Re-enable after recovery. Counters and in-flight connections are left
    /// alone.
    pub fn mark_active(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Topology-driven disablement: the endpoint left the desired set.
    /// Existing handlers keep running until they close naturally.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Create a guard that holds one slot of the connection count.
    ///
    /// Called only after the outbound connect succeeded, so a failed connect
    /// never touches the counter.
    pub fn track_connection(self: &Arc<Self>) -> ConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            backend: Arc::clone(self),
        }
    }

    fn release_connection(&self) {
        // Saturate at zero: a health-driven reset may have already zeroed
        // the counter while this handler was still draining.
        let _ = self
            .active_connections
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }
}

/// RAII guard for one active connection; decrements the count on drop.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<BackendStatus>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend.release_connection();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(port: u16) -> Arc<BackendStatus> {
        Arc::new(BackendStatus::new(BackendEndpoint::new("127.0.0.1", port)))
    }

    #[test]
    fn guard_round_trips_counter() {
        let b = status(9001);
        let guards: Vec<_> = (0..5).map(|_| b.track_connection()).collect();
        assert_eq!(b.active_connections(), 5);
        drop(guards);
        assert_eq!(b.active_connections(), 0);
    }

    #[test]
    fn concurrent_increments_are_exact() {
        let b = status(9001);
        let mut handles = Vec::new();
        for _ in 0..8 {
            let b = Arc::clone(&b);
            handles.push(std::thread::spawn(move || {
                let guards: Vec<_> = (0..100).map(|_| b.track_connection()).collect();
                std::mem::forget(guards);
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(b.active_connections(), 800);
    }

    #[test]
    fn decrement_saturates_after_reset() {
        let b = status(9001);
        let guard = b.track_connection();
        b.mark_inactive();
        assert_eq!(b.active_connections(), 0);
        drop(guard);
        assert_eq!(b.active_connections(), 0);
    }

    #[test]
    fn mark_inactive_cancels_subscribers() {
        let b = status(9001);
        let mut rx = b.subscribe_cancel();
        b.mark_inactive();
        assert!(!b.is_enabled());
        assert!(rx.try_recv().is_ok());

        // A receiver subscribed after the cancel sees nothing.
        let mut late = b.subscribe_cancel();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn disable_does_not_cancel() {
        let b = status(9001);
        let _guard = b.track_connection();
        let mut rx = b.subscribe_cancel();
        b.disable();
        assert!(!b.is_enabled());
        assert_eq!(b.active_connections(), 1);
        assert!(rx.try_recv().is_err());
    }
}

//! Periodic backend health probing.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time;

use crate::balancer::{BackendRegistry, BackendStatus};
use crate::config::schema::HealthCheckConfig;

pub struct HealthMonitor {
    registry: Arc<BackendRegistry>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub fn new(registry: Arc<BackendRegistry>, config: HealthCheckConfig) -> Self {
        Self { registry, config }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            interval = self.config.interval_secs,
            probe_timeout = self.config.probe_timeout_secs,
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// One pass over a snapshot of the registry taken at pass start.
    async fn check_all(&self) {
        for backend in self.registry.snapshot() {
            let was_healthy = backend.is_healthy();
            let is_healthy = self.probe(&backend).await;

            if was_healthy == is_healthy {
                continue;
            }

            backend.set_healthy(is_healthy);
            tracing::info!(
                backend = %backend.endpoint,
                healthy = is_healthy,
                "Backend health changed"
            );

            if !is_healthy {
                // A backend that failed a probe cannot be trusted to carry
                // existing traffic: disable it, zero its counter and cancel
                // every in-flight handler bound to it.
                backend.mark_inactive();
                tracing::info!(
                    backend = %backend.endpoint,
                    "Backend marked inactive, connections reset"
                );
            } else if !backend.is_enabled() {
                backend.mark_active();
                tracing::info!(backend = %backend.endpoint, "Backend recovered and enabled");
            }
        }
    }

    /// Probe = bare connection attempt within the configured timeout,
    /// independent of the forwarding idle timeout.
    async fn probe(&self, backend: &BackendStatus) -> bool {
        let timeout = Duration::from_secs(self.config.probe_timeout_secs);
        let addr = (backend.endpoint.host.as_str(), backend.endpoint.port);

        match time::timeout(timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!(backend = %backend.endpoint, error = %e, "Probe failed: connect error");
                false
            }
            Err(_) => {
                tracing::debug!(backend = %backend.endpoint, "Probe failed: timeout");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balancer::BackendEndpoint;
    use tokio::net::TcpListener;

    fn monitor(registry: Arc<BackendRegistry>) -> HealthMonitor {
        HealthMonitor::new(
            registry,
            HealthCheckConfig {
                interval_secs: 1,
                probe_timeout_secs: 1,
            },
        )
    }

    #[tokio::test]
    async fn pass_marks_unreachable_backend_inactive() {
        let registry = Arc::new(BackendRegistry::new());
        // Reserve a port, then close it so the connect is refused.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        registry.apply_desired(&[BackendEndpoint::new("127.0.0.1", port)]);
        let backend = registry.snapshot()[0].clone();
        let _guard = backend.track_connection();
        let mut cancel = backend.subscribe_cancel();

        monitor(Arc::clone(&registry)).check_all().await;

        assert!(!backend.is_healthy());
        assert!(!backend.is_enabled());
        assert_eq!(backend.active_connections(), 0);
        assert!(cancel.try_recv().is_ok());
    }

    #[tokio::test]
    async fn recovery_reenables_without_touching_counters() {
        let registry = Arc::new(BackendRegistry::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        registry.apply_desired(&[BackendEndpoint::new("127.0.0.1", port)]);
        let backend = registry.snapshot()[0].clone();
        backend.set_healthy(false);
        backend.disable();
        let _guard = backend.track_connection();

        monitor(Arc::clone(&registry)).check_all().await;

        assert!(backend.is_healthy());
        assert!(backend.is_enabled());
        assert_eq!(backend.active_connections(), 1);
    }

    #[tokio::test]
    async fn steady_state_changes_nothing() {
        let registry = Arc::new(BackendRegistry::new());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        registry.apply_desired(&[BackendEndpoint::new("127.0.0.1", port)]);
        let backend = registry.snapshot()[0].clone();
        let mut cancel = backend.subscribe_cancel();

        monitor(Arc::clone(&registry)).check_all().await;

        assert!(backend.is_healthy());
        assert!(backend.is_enabled());
        assert!(cancel.try_recv().is_err());
    }
}

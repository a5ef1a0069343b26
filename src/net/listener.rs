//! Accept loop with backpressure.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept connections until shutdown, bounded by a semaphore
//! - Ask the selector for a backend; close the client immediately when none
//!   is available
//! - Dispatch each connection to an independent handler task

use std::net::SocketAddr;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::balancer::Selector;
use crate::config::BalancerConfig;
use crate::lifecycle::Shutdown;
use crate::net::handler::ConnectionHandler;

/// Error type for listener operations.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("Failed to bind: {0}")]
    Bind(std::io::Error),
    #[error("Invalid listen address {0:?}")]
    Address(String),
}

/// The acceptor: a bounded TCP listener driving the selector and spawning
/// one [`ConnectionHandler`] task per accepted connection.
pub struct Acceptor {
    inner: TcpListener,
    connection_limit: Arc<Semaphore>,
    selector: Arc<Selector>,
    config: Arc<ArcSwap<BalancerConfig>>,
}

impl Acceptor {
    /// Bind to the configured address with connection limits.
    pub async fn bind(
        config: Arc<ArcSwap<BalancerConfig>>,
        selector: Arc<Selector>,
    ) -> Result<Self, ListenerError> {
        let current = config.load_full();
        let addr: SocketAddr = current
            .listener
            .bind_address
            .parse()
            .map_err(|_| ListenerError::Address(current.listener.bind_address.clone()))?;

        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;

        tracing::info!(
            address = %local_addr,
            max_connections = current.listener.max_connections,
            "Listener bound"
        );

        Ok(Self {
            inner: listener,
            connection_limit: Arc::new(Semaphore::new(current.listener.max_connections)),
            selector,
            config,
        })
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Accept until the shutdown signal fires.
    ///
    /// Consumes the acceptor; when this returns, the listening socket drops
    /// and new connection attempts are refused at the socket level.
    /// Already-dispatched handlers keep draining on their own.
    pub async fn run(self, shutdown: Arc<Shutdown>) {
        let mut shutdown_rx = shutdown.subscribe();

        loop {
            // Acquire a slot first (backpressure), then accept.
            let permit = tokio::select! {
                _ = shutdown_rx.recv() => break,
                permit = self.connection_limit.clone().acquire_owned() => {
                    permit.expect("Semaphore closed unexpectedly")
                }
            };

            let (stream, peer) = tokio::select! {
                _ = shutdown_rx.recv() => break,
                res = self.inner.accept() => match res {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Transient accept error");
                        continue;
                    }
                }
            };

            tracing::debug!(
                peer = %peer,
                available_permits = self.connection_limit.available_permits(),
                "Connection accepted"
            );

            let backend = match self.selector.next_backend() {
                Ok(backend) => backend,
                Err(e) => {
                    // Recoverable: drop this client, keep serving others.
                    tracing::warn!(peer = %peer, error = %e, "Closing connection");
                    continue;
                }
            };

            let handler = ConnectionHandler::new(stream, peer, backend, Arc::clone(&self.config));
            let handler_shutdown = shutdown.subscribe();
            tokio::spawn(async move {
                handler.run(handler_shutdown).await;
                drop(permit);
            });
        }

        tracing::info!("Listener stopped accepting connections");
    }
}

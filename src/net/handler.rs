//! Per-connection forwarding.
//!
//! # Responsibilities
//! - Bridge one accepted client socket to one chosen backend
//! - State machine: Connecting → Forwarding → Closing → Closed
//! - Two concurrent copy loops with idle timeout and cooperative shutdown
//! - Guaranteed symmetric cleanup (counter decrement, socket close) on every
//!   exit path
//!
//! # Design Decisions
//! - The connection counter is incremented only after a successful backend
//!   connect, and decremented exactly once via an RAII guard
//! - Whichever copy direction finishes first cancels the other through a
//!   local stop channel, so half-open pairs cannot leak
//! - Transport errors are never retried; the client reconnects and takes a
//!   fresh path through the selector

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time;

use crate::balancer::BackendStatus;
use crate::config::schema::SocketConfig;
use crate::config::BalancerConfig;

/// Fixed copy buffer, one per direction.
const BUFFER_SIZE: usize = 8 * 1024;

/// Owns one accepted client socket and the backend chosen for it.
pub struct ConnectionHandler {
    client: TcpStream,
    peer: SocketAddr,
    backend: Arc<BackendStatus>,
    config: Arc<ArcSwap<BalancerConfig>>,
}

impl ConnectionHandler {
    pub fn new(
        client: TcpStream,
        peer: SocketAddr,
        backend: Arc<BackendStatus>,
        config: Arc<ArcSwap<BalancerConfig>>,
    ) -> Self {
        Self {
            client,
            peer,
            backend,
            config,
        }
    }

    /// Drive the connection to completion. Never returns an error: every
    /// failure is logged and confined to this connection.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let config = self.config.load_full();
        let endpoint = self.backend.endpoint.clone();

        // Connecting. A failure here goes straight to Closed: the counter
        // was never incremented and there is no retry.
        let connect_timeout = Duration::from_secs(config.timeouts.connect_secs);
        let addr = (endpoint.host.as_str(), endpoint.port);
        let backend_stream = tokio::select! {
            res = time::timeout(connect_timeout, TcpStream::connect(addr)) => match res {
                Ok(Ok(stream)) => stream,
                Ok(Err(e)) => {
                    tracing::warn!(backend = %endpoint, peer = %self.peer, error = %e, "Backend connect failed");
                    return;
                }
                Err(_) => {
                    tracing::warn!(backend = %endpoint, peer = %self.peer, "Backend connect timed out");
                    return;
                }
            },
            _ = shutdown.recv() => {
                tracing::debug!(peer = %self.peer, "Shutdown during connect, dropping connection");
                return;
            }
        };

        if let Err(e) = configure_socket(&self.client, &config.socket) {
            tracing::warn!(peer = %self.peer, error = %e, "Failed to set client socket options");
        }
        if let Err(e) = configure_socket(&backend_stream, &config.socket) {
            tracing::warn!(backend = %endpoint, error = %e, "Failed to set backend socket options");
        }

        tracing::info!(backend = %endpoint, peer = %self.peer, "Connected to backend");

        // Subscribe before the increment: receivers never observe sends that
        // precede their subscription, so a cancel landing between the
        // increment and a later subscribe would be lost.
        let cancel_client_to_backend = self.backend.subscribe_cancel();
        let cancel_backend_to_client = self.backend.subscribe_cancel();

        // The guard decrements on drop, covering every exit path below.
        let _guard = self.backend.track_connection();

        // Forwarding: two copy loops sharing a stop channel. The first one
        // to finish (EOF, error, idle timeout or cancellation) stops the
        // other, then both are awaited.
        let idle_timeout = Duration::from_secs(config.timeouts.idle_secs);
        let (client_read, client_write) = self.client.into_split();
        let (backend_read, backend_write) = backend_stream.into_split();
        let (stop_tx, _) = broadcast::channel::<()>(1);

        let client_to_backend = copy_with_idle_timeout(
            client_read,
            backend_write,
            "client->backend",
            idle_timeout,
            shutdown.resubscribe(),
            cancel_client_to_backend,
            stop_tx.clone(),
            stop_tx.subscribe(),
        );
        let backend_to_client = copy_with_idle_timeout(
            backend_read,
            client_write,
            "backend->client",
            idle_timeout,
            shutdown,
            cancel_backend_to_client,
            stop_tx.clone(),
            stop_tx.subscribe(),
        );

        tokio::join!(client_to_backend, backend_to_client);

        // Closing: both halves drop here, which closes the client socket
        // unconditionally; the guard drop restores the counter.
        tracing::info!(backend = %endpoint, peer = %self.peer, "Connection closed");
    }
}

/// Apply the configured per-connection socket options.
fn configure_socket(stream: &TcpStream, options: &SocketConfig) -> std::io::Result<()> {
    if options.nodelay {
        stream.set_nodelay(true)?;
    }
    if options.keepalive {
        socket2::SockRef::from(stream).set_keepalive(true)?;
    }
    Ok(())
}

/// Copy one direction until EOF, error, idle timeout or cancellation, then
/// signal the sibling direction to stop.
#[allow(clippy::too_many_arguments)]
async fn copy_with_idle_timeout<R, W>(
    mut from: R,
    mut to: W,
    direction: &'static str,
    idle_timeout: Duration,
    mut shutdown: broadcast::Receiver<()>,
    mut backend_cancel: broadcast::Receiver<()>,
    stop_tx: broadcast::Sender<()>,
    mut stop_rx: broadcast::Receiver<()>,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        // The idle timer restarts each iteration: it bounds the wait for the
        // next read, not the connection lifetime.
        let read = tokio::select! {
            res = from.read(&mut buffer) => res,
            _ = time::sleep(idle_timeout) => {
                tracing::info!(direction, idle_secs = idle_timeout.as_secs(), "Idle timeout reached");
                break;
            }
            _ = shutdown.recv() => {
                tracing::debug!(direction, "Forwarding canceled by shutdown");
                break;
            }
            _ = backend_cancel.recv() => {
                tracing::info!(direction, "Forwarding canceled: backend marked inactive");
                break;
            }
            _ = stop_rx.recv() => break,
        };

        match read {
            Ok(0) => {
                tracing::debug!(direction, "Connection closed by peer");
                break;
            }
            Ok(n) => {
                // The write must honor the same cancellation as the read: a
                // backend that stopped draining parks write_all on a full
                // send buffer, and a cancel has to reach it there too.
                let written = tokio::select! {
                    res = to.write_all(&buffer[..n]) => res,
                    _ = shutdown.recv() => {
                        tracing::debug!(direction, "Write canceled by shutdown");
                        break;
                    }
                    _ = backend_cancel.recv() => {
                        tracing::info!(direction, "Write canceled: backend marked inactive");
                        break;
                    }
                    _ = stop_rx.recv() => break,
                };
                if let Err(e) = written {
                    tracing::warn!(direction, error = %e, "Write error");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(direction, error = %e, "Read error");
                break;
            }
        }
    }

    // Propagate EOF to the other peer and stop the sibling loop.
    let _ = to.shutdown().await;
    let _ = stop_tx.send(());
    tracing::debug!(direction, "Stream copy completed");
}

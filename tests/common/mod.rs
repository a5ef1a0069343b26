//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use tcp_balancer::balancer::{BackendEndpoint, BackendRegistry, Selector};
use tcp_balancer::config::BalancerConfig;
use tcp_balancer::lifecycle::Shutdown;
use tcp_balancer::net::Acceptor;

/// Start a mock backend that echoes everything it receives.
pub async fn start_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that accepts and then stays silent, keeping the
/// socket open so neither side ever sees EOF.
#[allow(dead_code)]
pub async fn start_silent_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let mut buf = [0u8; 4096];
                        // Drain without ever responding.
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(_) => {}
                            }
                        }
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Start a mock backend that accepts and then never reads, so bytes pile up
/// in the kernel buffers until the forwarding write path blocks.
#[allow(dead_code)]
pub async fn start_blackhole_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    tokio::spawn(async move {
                        let _socket = socket;
                        std::future::pending::<()>().await
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// A balancer wired up for tests on an ephemeral port.
pub struct TestBalancer {
    pub addr: SocketAddr,
    pub registry: Arc<BackendRegistry>,
    pub selector: Arc<Selector>,
    pub shutdown: Arc<Shutdown>,
    pub acceptor_task: JoinHandle<()>,
}

/// Start a full balancer (acceptor + selector + registry) for the given
/// backends. Health monitoring is not started; tests drive health
/// transitions directly.
pub async fn start_balancer(
    strategy: &str,
    backends: &[BackendEndpoint],
    idle_secs: u64,
) -> TestBalancer {
    let mut config = BalancerConfig::default();
    config.listener.bind_address = "127.0.0.1:0".to_string();
    config.backends = backends.to_vec();
    config.timeouts.idle_secs = idle_secs;
    config.timeouts.connect_secs = 2;
    let config = Arc::new(ArcSwap::from_pointee(config));

    let registry = Arc::new(BackendRegistry::new());
    let enabled = registry.apply_desired(backends);
    let selector = Arc::new(Selector::from_strategy_name(strategy, enabled).unwrap());
    let shutdown = Arc::new(Shutdown::new());

    let acceptor = Acceptor::bind(config, Arc::clone(&selector)).await.unwrap();
    let addr = acceptor.local_addr().unwrap();
    let acceptor_task = tokio::spawn(acceptor.run(Arc::clone(&shutdown)));

    TestBalancer {
        addr,
        registry,
        selector,
        shutdown,
        acceptor_task,
    }
}

/// Turn a mock backend address into a config endpoint.
pub fn endpoint_of(addr: SocketAddr) -> BackendEndpoint {
    BackendEndpoint::new(addr.ip().to_string(), addr.port())
}

/// Poll until the condition holds or the timeout elapses.
pub async fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}

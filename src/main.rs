//! TCP load balancer.
//!
//! Accepts inbound client connections, picks a live backend by the
//! configured strategy, and relays bytes bidirectionally until either side
//! closes, the connection goes idle, or the backend is marked inactive.
//!
//! ```text
//!                  ┌───────────────────────────────────────────────┐
//!                  │                 TCP BALANCER                  │
//!   Client ────────┼─▶ acceptor ──▶ selector ──▶ handler ◀─────────┼──── Backend
//!                  │     │            │  ▲         │               │
//!                  │     │            ▼  │         ▼               │
//!                  │     │        ┌──────────────────────┐         │
//!                  │     └───────▶│   backend registry   │         │
//!                  │              └──────────────────────┘         │
//!                  │                ▲        ▲        │            │
//!                  │         health │   sync │        ▼ snapshot   │
//!                  │        monitor │ (reload)│  status writer     │
//!                  └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tcp_balancer::balancer::{BackendRegistry, Selector};
use tcp_balancer::config::{load_config, ConfigWatcher};
use tcp_balancer::health::HealthMonitor;
use tcp_balancer::lifecycle::{signals, Shutdown};
use tcp_balancer::net::Acceptor;
use tcp_balancer::status::StatusFileWriter;

#[derive(Debug, Parser)]
#[command(name = "tcp-balancer", about = "TCP-level load balancer")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "config/balancer.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing subscriber
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tcp_balancer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("tcp-balancer v0.1.0 starting");

    let args = Args::parse();

    // Configuration errors are the only fatal ones: an unknown strategy or
    // unparseable file must stop the process before any traffic is accepted.
    let initial = load_config(&args.config)?;
    tracing::info!(
        strategy = %initial.strategy.as_str(),
        bind_address = %initial.listener.bind_address,
        backends = initial.backends.len(),
        health_interval_secs = initial.health_check.interval_secs,
        idle_timeout_secs = initial.timeouts.idle_secs,
        "Configuration loaded"
    );

    let config = Arc::new(ArcSwap::from_pointee(initial));
    let current = config.load_full();

    let shutdown = Arc::new(Shutdown::new());
    let registry = Arc::new(BackendRegistry::new());

    // Initial backend sync, then the selector over the enabled subset.
    let enabled = registry.apply_desired(&current.backends);
    let selector = Arc::new(Selector::from_strategy_name(
        current.strategy.as_str(),
        enabled,
    )?);

    // Health monitor loop.
    let monitor = HealthMonitor::new(Arc::clone(&registry), current.health_check.clone());
    tokio::spawn(monitor.run(shutdown.subscribe()));

    // Status file for the external monitoring collaborator.
    if current.status.enabled {
        let writer = StatusFileWriter::new(
            Arc::clone(&registry),
            PathBuf::from(&current.status.file_path),
            Duration::from_secs(current.status.interval_secs),
        );
        tokio::spawn(writer.run(shutdown.subscribe()));
    }

    // Hot reload: each accepted config triggers backend reconciliation.
    let (watcher, mut config_updates) = ConfigWatcher::new(&args.config);
    let _watcher_guard = match watcher.run() {
        Ok(guard) => Some(guard),
        Err(e) => {
            tracing::warn!(error = %e, "Config watcher unavailable, hot reload disabled");
            None
        }
    };
    {
        let registry = Arc::clone(&registry);
        let selector = Arc::clone(&selector);
        let config = Arc::clone(&config);
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(backends = new_config.backends.len(), "Applying reloaded configuration");
                let enabled = registry.apply_desired(&new_config.backends);
                selector.update_backends(enabled);
                config.store(Arc::new(new_config));
            }
        });
    }

    tokio::spawn(signals::shutdown_on_signal(Arc::clone(&shutdown)));

    // Accept until shutdown; handlers drain on their own afterwards.
    let acceptor = Acceptor::bind(Arc::clone(&config), selector).await?;
    acceptor.run(Arc::clone(&shutdown)).await;

    tracing::info!(
        subscribed_tasks = shutdown.receiver_count(),
        "Listener stopped, draining in-flight connections"
    );
    tracing::info!("Shutdown complete");
    Ok(())
}

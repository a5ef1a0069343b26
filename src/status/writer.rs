//! Periodic status file writer.
//!
//! An external monitoring collaborator polls the file; the balancer only
//! produces it. One JSON document per pass, overwritten in place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use crate::balancer::BackendRegistry;
use crate::status::StatusSnapshot;

pub struct StatusFileWriter {
    registry: Arc<BackendRegistry>,
    path: PathBuf,
    interval: Duration,
}

impl StatusFileWriter {
    pub fn new(registry: Arc<BackendRegistry>, path: PathBuf, interval: Duration) -> Self {
        Self {
            registry,
            path,
            interval,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(path = ?self.path, interval_secs = self.interval.as_secs(), "Status writer starting");

        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.write_once() {
                        tracing::warn!(error = %e, "Failed to write status file");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Status writer received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    fn write_once(&self) -> std::io::Result<()> {
        let snapshot = StatusSnapshot::capture(&self.registry);
        let json = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, json)
    }
}

//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::BalancerConfig;

/// Editors and atomic-save tools emit bursts of modify events for a single
/// logical change; reloads inside this window are collapsed into one.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

/// A watcher that monitors the configuration file for changes.
///
/// Validated reloads are delivered on the returned channel; invalid files
/// are logged and the running configuration is kept.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<BalancerConfig>,
}

impl ConfigWatcher {
    /// Create a new watcher and the receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<BalancerConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for notifications to flow.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();
        let mut gate = DebounceGate::new(DEBOUNCE_WINDOW);

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        if !gate.should_fire(Instant::now()) {
                            tracing::trace!("Config event inside debounce window, skipping");
                            return;
                        }
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Rate gate for reload attempts: fires at most once per window.
#[derive(Debug)]
struct DebounceGate {
    window: Duration,
    last_fired: Option<Instant>,
}

impl DebounceGate {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: None,
        }
    }

    fn should_fire(&mut self, now: Instant) -> bool {
        match self.last_fired {
            Some(prev) if now.duration_since(prev) < self.window => false,
            _ => {
                self.last_fired = Some(now);
                true
            }
        }
    }
}

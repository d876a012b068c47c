//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::{load_config, Overrides};
use crate::config::schema::SupervisorConfig;

/// Reloads the config file and forwards valid results to the supervisor.
///
/// Shared by the file watcher and the SIGHUP handler.
#[derive(Debug, Clone)]
pub struct ConfigReloader {
    path: PathBuf,
    overrides: Overrides,
    update_tx: mpsc::UnboundedSender<SupervisorConfig>,
}

impl ConfigReloader {
    /// Returns the reloader and the receiver the supervisor drains.
    pub fn new(
        path: &Path,
        overrides: Overrides,
    ) -> (Self, mpsc::UnboundedReceiver<SupervisorConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                overrides,
                update_tx,
            },
            update_rx,
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load, validate and forward. Invalid files keep the current config.
    pub fn reload(&self) -> bool {
        match load_config(Some(&self.path), &self.overrides) {
            Ok(config) => {
                tracing::info!(path = %self.path.display(), "Configuration reloaded");
                self.update_tx.send(config).is_ok()
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to reload config, keeping current configuration");
                false
            }
        }
    }
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    reloader: ConfigReloader,
}

impl ConfigWatcher {
    pub fn new(reloader: ConfigReloader) -> Self {
        Self { reloader }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher stops when dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let reloader = self.reloader.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        reloader.reload();
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(self.reloader.path(), RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.reloader.path(), "Config watcher started");
        Ok(watcher)
    }
}

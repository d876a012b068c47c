//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - Translate signals to shutdown or config reload
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are registered before the supervisor starts, so
//!   registration failures surface as startup errors
//! - SIGHUP triggers config reload, not shutdown

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::task::JoinHandle;

use crate::config::ConfigReloader;
use crate::lifecycle::Shutdown;

/// Spawn the signal listener task.
///
/// Without a reloader (no config file), SIGHUP is logged and ignored.
pub fn spawn_signal_handler(
    shutdown: Shutdown,
    reloader: Option<ConfigReloader>,
) -> io::Result<JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                    shutdown.trigger();
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT, shutting down");
                    shutdown.trigger();
                }
                _ = sighup.recv() => match &reloader {
                    Some(reloader) => {
                        tracing::info!(path = %reloader.path().display(), "Received SIGHUP, reloading configuration");
                        reloader.reload();
                    }
                    None => tracing::warn!("Received SIGHUP but no config file is in use, ignoring"),
                },
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn sigterm_triggers_shutdown() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.subscribe();
        let handle = spawn_signal_handler(shutdown, None).unwrap();

        unsafe {
            libc::kill(libc::getpid(), libc::SIGTERM);
        }

        let received = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert!(matches!(received, Ok(Ok(()))));
        handle.abort();
    }
}

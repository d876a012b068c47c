//! Shutdown coordination for the supervisor.

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Runtime;
use tokio::sync::broadcast;

/// Coordinator for shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    ///
    /// Subscribers created after [`Shutdown::trigger`] do not see it.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Drive `future` to completion, then tear the runtime down.
///
/// Blocking-pool threads stuck on a hung mount are abandoned after `grace`
/// instead of holding the process open.
pub fn run_to_completion<F: Future>(runtime: Runtime, future: F, grace: Duration) -> F::Output {
    let output = runtime.block_on(future);
    runtime.shutdown_timeout(grace);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    use crate::resilience::timeouts::run_blocking;

    #[test]
    fn stuck_blocking_work_does_not_hold_the_process() {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let started = Instant::now();

        let abandoned = run_to_completion(
            runtime,
            run_blocking(Duration::from_millis(50), || {
                std::thread::sleep(Duration::from_secs(10));
            }),
            Duration::from_millis(100),
        );

        assert!(abandoned.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn trigger_reaches_every_subscriber() {
        let shutdown = Shutdown::new();
        let mut first = shutdown.subscribe();
        let mut second = shutdown.clone().subscribe();

        shutdown.trigger();

        assert!(first.recv().await.is_ok());
        assert!(second.recv().await.is_ok());
    }

    #[test]
    fn trigger_without_subscribers_is_harmless() {
        Shutdown::default().trigger();
    }
}

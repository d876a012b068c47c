//! Timeout enforcement for blocking filesystem work.
//!
//! # Responsibilities
//! - Run a blocking closure on the blocking pool under a deadline
//! - Report an elapsed deadline distinctly from a failed closure
//!
//! # Design Decisions
//! - A hung network filesystem blocks `stat`-like calls in the kernel, so the
//!   work is moved off the control thread and abandoned on timeout
//! - An abandoned blocking thread is left to finish on its own; it holds no
//!   child process and no supervisor state, and process exit does not wait
//!   for it (see `lifecycle::shutdown::run_to_completion`)

use std::time::Duration;
use thiserror::Error;

/// Failure of a bounded blocking call.
#[derive(Debug, Error)]
pub enum BoundedError {
    #[error("operation did not finish within {0:?}")]
    TimedOut(Duration),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Run `work` on the blocking pool, giving up after `limit`.
pub async fn run_blocking<T, F>(limit: Duration, work: F) -> Result<T, BoundedError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(limit, handle).await {
        Ok(joined) => Ok(joined?),
        Err(_) => Err(BoundedError::TimedOut(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_value_within_limit() {
        let value = run_blocking(Duration::from_secs(1), || 41 + 1).await.unwrap();
        assert_eq!(value, 42);
    }

    #[tokio::test]
    async fn reports_timeout_for_slow_work() {
        let result = run_blocking(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(500));
        })
        .await;
        assert!(matches!(result, Err(BoundedError::TimedOut(_))));
    }
}

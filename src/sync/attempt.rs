//! Record of one sync run within a cycle.

use std::time::Duration;

use crate::process::ExitOutcome;
use crate::sync::tool::SyncRequest;

/// A finished sync attempt. Lives only for the cycle that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAttempt {
    pub request: SyncRequest,
    pub outcome: ExitOutcome,
    pub elapsed: Duration,
}

impl SyncAttempt {
    pub fn succeeded(&self) -> bool {
        self.outcome.is_success()
    }

    /// One-line description for logs and notifications.
    pub fn describe(&self) -> String {
        let dry = if self.request.dry_run { " (dry run)" } else { "" };
        format!(
            "{} sync {}{} {} after {:.1}s",
            self.request.label(),
            self.request.direction,
            dry,
            self.outcome,
            self.elapsed.as_secs_f64()
        )
    }
}

//! Health verdicts.
//!
//! # Decision Table
//! ```text
//! mode      sync     write probe        verdict
//! Normal    fail     -                  Failover
//! Normal    ok       none / ok          StayHealthy
//! Normal    ok       fail               Failover
//! Failover  fail     -                  StayDegraded
//! Failover  ok       none / ok          Failback (pending reconciliation)
//! Failover  ok       fail               StayDegraded
//! ```
//!
//! # Design Decisions
//! - Pure function of its inputs; never touches the filesystem
//! - A write-probe failure during recovery keeps the system degraded

use crate::failover::Mode;
use crate::process::ExitOutcome;

/// What the state machine should do after a cycle's attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    StayHealthy,
    StayDegraded,
    Failover,
    /// Attempt failback; only completes if the reconciliation sync succeeds.
    Failback,
}

/// Decide the verdict for `mode` given the sync outcome and, when a write
/// probe ran, its outcome.
pub fn evaluate(mode: Mode, sync: &ExitOutcome, probe: Option<&ExitOutcome>) -> Verdict {
    let healthy = sync.is_success() && probe.map_or(true, ExitOutcome::is_success);
    match (mode, healthy) {
        (Mode::Normal, true) => Verdict::StayHealthy,
        (Mode::Normal, false) => Verdict::Failover,
        (Mode::Failover, true) => Verdict::Failback,
        (Mode::Failover, false) => Verdict::StayDegraded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_table() {
        use ExitOutcome::*;
        use Mode::{Failover as Degraded, Normal};

        let ok = || Success;
        let code = |c| Failed { code: Some(c) };
        let rows: Vec<(Mode, ExitOutcome, Option<ExitOutcome>, Verdict)> = vec![
            (Normal, ok(), None, Verdict::StayHealthy),
            (Normal, ok(), Some(ok()), Verdict::StayHealthy),
            (Normal, ok(), Some(code(1)), Verdict::Failover),
            (Normal, ok(), Some(TimedOut), Verdict::Failover),
            (Normal, code(23), None, Verdict::Failover),
            (Normal, Failed { code: None }, None, Verdict::Failover),
            (Normal, TimedOut, None, Verdict::Failover),
            (Normal, Unkillable, None, Verdict::Failover),
            (Normal, SpawnFailed("missing".into()), None, Verdict::Failover),
            (Normal, WaitFailed("ECHILD".into()), None, Verdict::Failover),
            (Degraded, ok(), None, Verdict::Failback),
            (Degraded, ok(), Some(ok()), Verdict::Failback),
            (Degraded, ok(), Some(code(1)), Verdict::StayDegraded),
            (Degraded, ok(), Some(Unkillable), Verdict::StayDegraded),
            (Degraded, code(23), None, Verdict::StayDegraded),
            (Degraded, TimedOut, None, Verdict::StayDegraded),
            (Degraded, Unkillable, None, Verdict::StayDegraded),
            (Degraded, SpawnFailed("missing".into()), None, Verdict::StayDegraded),
        ];

        for (mode, sync, probe, verdict) in rows {
            assert_eq!(
                evaluate(mode, &sync, probe.as_ref()),
                verdict,
                "mode={mode:?} sync={sync:?} probe={probe:?}"
            );
        }
    }

    #[test]
    fn same_inputs_same_verdict() {
        let sync = ExitOutcome::TimedOut;
        let first = evaluate(Mode::Normal, &sync, None);
        for _ in 0..10 {
            assert_eq!(evaluate(Mode::Normal, &sync, None), first);
        }
    }

    #[test]
    fn probe_failure_counts_as_sync_failure_in_normal_mode() {
        let verdict = evaluate(
            Mode::Normal,
            &ExitOutcome::Success,
            Some(&ExitOutcome::Failed { code: Some(1) }),
        );
        assert_eq!(verdict, Verdict::Failover);
    }

    #[test]
    fn probe_failure_during_recovery_stays_degraded() {
        let verdict = evaluate(
            Mode::Failover,
            &ExitOutcome::Success,
            Some(&ExitOutcome::TimedOut),
        );
        assert_eq!(verdict, Verdict::StayDegraded);
    }

    #[test]
    fn timeout_in_normal_mode_fails_over() {
        assert_eq!(
            evaluate(Mode::Normal, &ExitOutcome::TimedOut, None),
            Verdict::Failover
        );
    }
}

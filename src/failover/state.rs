//! Operating mode and per-supervisor runtime state.
//!
//! # States
//! - Normal: link → primary, mirror primary → secondary each cycle
//! - Failover: link → secondary, dry-run primary → secondary each cycle to
//!   detect recovery
//!
//! # State Transitions
//! ```text
//! Normal → Failover: sync or write probe failed, link repointed
//! Failover → Normal: recovery probe ok, reconciliation ok, link repointed
//! ```

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};

use crate::link::Role;

/// Operating mode of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Failover,
}

impl Mode {
    /// The directory the access link points at in this mode.
    pub fn link_role(&self) -> Role {
        match self {
            Mode::Normal => Role::Primary,
            Mode::Failover => Role::Secondary,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Normal => "normal",
            Mode::Failover => "failover",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State owned by the failover state machine.
#[derive(Debug, Clone)]
pub struct SupervisorState {
    mode: Mode,
    /// Run the next cycle without sleeping; consumed once.
    skip_next_sleep: bool,
    cycles: u64,
    last_transition: Option<DateTime<Local>>,
}

impl SupervisorState {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            skip_next_sleep: false,
            cycles: 0,
            last_transition: None,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn last_transition(&self) -> Option<DateTime<Local>> {
        self.last_transition
    }

    pub fn skip_next_sleep(&self) -> bool {
        self.skip_next_sleep
    }

    pub(crate) fn begin_cycle(&mut self) -> u64 {
        self.cycles += 1;
        self.cycles
    }

    /// Record a completed transition into `mode`.
    pub(crate) fn enter(&mut self, mode: Mode) {
        self.mode = mode;
        self.last_transition = Some(Local::now());
    }

    pub(crate) fn request_fast_retry(&mut self) {
        self.skip_next_sleep = true;
    }

    /// The sleep before the next cycle, or `None` if it should be skipped.
    pub fn take_sleep(&mut self, interval: Duration) -> Option<Duration> {
        if std::mem::take(&mut self.skip_next_sleep) {
            None
        } else {
            Some(interval)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fast_retry_skips_exactly_one_sleep() {
        let interval = Duration::from_secs(30);
        let mut state = SupervisorState::new(Mode::Failover);
        state.request_fast_retry();

        assert_eq!(state.take_sleep(interval), None);
        assert_eq!(state.take_sleep(interval), Some(interval));
    }

    #[test]
    fn enter_records_transition() {
        let mut state = SupervisorState::new(Mode::Normal);
        assert!(state.last_transition().is_none());
        state.enter(Mode::Failover);
        assert_eq!(state.mode(), Mode::Failover);
        assert!(state.last_transition().is_some());
    }

    #[test]
    fn mode_maps_to_link_role() {
        assert_eq!(Mode::Normal.link_role(), Role::Primary);
        assert_eq!(Mode::Failover.link_role(), Role::Secondary);
    }
}

//! Write probe against the primary.
//!
//! A mirror sync only compares sizes and modification times, so an
//! operator-supplied shell command performs a real write on the primary's
//! storage as an additional health check.

use std::time::Duration;

use crate::config::ProbeConfig;
use crate::process::{CommandSpec, ExitOutcome};

/// Configured write probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteProbe {
    command: String,
    timeout: Duration,
}

impl WriteProbe {
    pub fn new(command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            command: command.into(),
            timeout,
        }
    }

    /// `None` when no probe command is configured.
    pub fn from_config(config: &ProbeConfig) -> Option<Self> {
        config
            .command
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(|c| Self::new(c, Duration::from_millis(config.timeout_ms)))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn spec(&self) -> CommandSpec {
        CommandSpec::shell("write-probe", &self.command)
    }
}

/// One write probe run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeAttempt {
    pub outcome: ExitOutcome,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_command_disables_probe() {
        let config = ProbeConfig {
            command: Some("   ".into()),
            timeout_ms: 1000,
        };
        assert!(WriteProbe::from_config(&config).is_none());
        assert!(WriteProbe::from_config(&ProbeConfig::default()).is_none());
    }

    #[test]
    fn probe_runs_through_shell() {
        let config = ProbeConfig {
            command: Some("date > /mnt/primary/.probe".into()),
            timeout_ms: 2500,
        };
        let probe = WriteProbe::from_config(&config).unwrap();
        assert_eq!(probe.timeout(), Duration::from_millis(2500));
        assert_eq!(
            probe.spec().command_line(),
            "/bin/sh -c date > /mnt/primary/.probe"
        );
    }
}

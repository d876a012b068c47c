//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! supervisor. All types derive Serde traits for deserialization from TOML.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the failover supervisor.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct SupervisorConfig {
    /// Access link and the two directories it may point at.
    pub paths: PathsConfig,

    /// Sync tool and cycle pacing.
    pub sync: SyncConfig,

    /// Optional write probe against the primary.
    pub probe: ProbeConfig,

    /// Termination policy for timed-out commands.
    pub runner: RunnerConfig,

    /// Failover/failback notifications.
    pub notify: NotifyConfig,

    /// Logging, command output and metrics.
    pub observability: ObservabilityConfig,

    /// Process-level switches.
    pub runtime: RuntimeConfig,
}

/// Filesystem locations. All three are required.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    /// The symbolic link consumers use.
    pub link: PathBuf,

    /// Preferred directory.
    pub primary: PathBuf,

    /// Standby copy kept in sync with the primary.
    pub secondary: PathBuf,
}

/// Sync tool invocation and cycle pacing.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct SyncConfig {
    /// rsync-compatible executable.
    pub program: String,

    /// Arguments placed before the mode flags.
    pub extra_args: Vec<String>,

    /// Hard limit for one sync run in milliseconds.
    pub timeout_ms: u64,

    /// Sleep between cycles in milliseconds.
    pub interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            program: "rsync".to_string(),
            extra_args: Vec::new(),
            timeout_ms: 60_000,
            interval_ms: 30_000,
        }
    }
}

/// Write probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Shell command performing a real write on the primary.
    pub command: Option<String>,

    /// Hard limit for the probe in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            command: None,
            timeout_ms: 10_000,
        }
    }
}

/// Escalation timing when a command exceeds its limit.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// First non-zero poll delay after a signal; later polls double it.
    pub kill_poll_base_ms: u64,

    /// Polls after SIGTERM and again after SIGKILL.
    pub kill_poll_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            kill_poll_base_ms: 500,
            kill_poll_attempts: 5,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotifyConfig {
    /// Mail addresses; empty disables mail.
    pub recipients: Vec<String>,

    /// `mail`-compatible command accepting `-s subject rcpt...`.
    pub mail_program: String,

    /// Limit for one delivery in milliseconds.
    pub timeout_ms: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            recipients: Vec::new(),
            mail_program: "mail".to_string(),
            timeout_ms: 30_000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log file; stderr when unset.
    pub log_file: Option<PathBuf>,

    /// File receiving stdout/stderr of sync and probe commands; discarded
    /// when unset.
    pub command_output: Option<PathBuf>,

    /// Precede each command's output with a timestamped marker line.
    pub timestamp_output: bool,

    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
            command_output: None,
            timestamp_output: true,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9187".to_string(),
        }
    }
}

/// Process-level switches, usually set from the command line.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Debug-level logging.
    pub verbose: bool,

    /// Observe only: dry-run syncs, no probe, no repoint, no mail.
    pub pretend: bool,

    /// Detach from the controlling terminal.
    pub daemonize: bool,
}

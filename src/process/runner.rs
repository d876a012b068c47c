//! Bounded process runner.
//!
//! # Responsibilities
//! - Launch an external command with its output redirected to a sink
//! - Enforce a hard wall-clock limit on the command
//! - Escalate SIGTERM → SIGKILL when the limit is exceeded
//! - Normalize every way a run can end into an [`ExitOutcome`]
//!
//! # Design Decisions
//! - Each child leads its own process group so signals reach its descendants
//! - A run that is still going when the limit elapses is a timeout, even if it
//!   exits in the same instant
//! - A child that survives SIGKILL is retained as lingering; no new child is
//!   started until it is confirmed dead

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tokio::process::Command;

use crate::process::guard::{ChildGuard, Signal};
use crate::process::output::OutputSink;
use crate::resilience::backoff::poll_schedule;

/// A command to run under supervision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    /// Short name used in logs, metrics and output markers.
    pub label: String,
    pub program: OsString,
    pub args: Vec<OsString>,
}

impl CommandSpec {
    pub fn new(label: impl Into<String>, program: impl AsRef<OsStr>) -> Self {
        Self {
            label: label.into(),
            program: program.as_ref().to_os_string(),
            args: Vec::new(),
        }
    }

    /// A command line interpreted by `/bin/sh -c`.
    pub fn shell(label: impl Into<String>, command: &str) -> Self {
        Self::new(label, "/bin/sh").arg("-c").arg(command)
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Human-readable command line.
    pub fn command_line(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| part.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Normalized result of one supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitOutcome {
    /// Exited on its own with status zero.
    Success,
    /// Exited on its own with a non-zero status (`None` when killed by a
    /// signal it did not receive from us).
    Failed { code: Option<i32> },
    /// Exceeded its limit and was terminated.
    TimedOut,
    /// Exceeded its limit and survived SIGKILL; the supervisor no longer
    /// controls it.
    Unkillable,
    /// Could not be started at all.
    SpawnFailed(String),
    /// Waiting on the child failed; it was terminated and its real exit
    /// status is unknown.
    WaitFailed(String),
}

impl ExitOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitOutcome::Success)
    }

    /// Stable label used for metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitOutcome::Success => "success",
            ExitOutcome::Failed { .. } => "failed",
            ExitOutcome::TimedOut => "timed_out",
            ExitOutcome::Unkillable => "unkillable",
            ExitOutcome::SpawnFailed(_) => "spawn_failed",
            ExitOutcome::WaitFailed(_) => "wait_failed",
        }
    }

    /// Outcome of a child that exited by itself after `elapsed` of `limit`.
    ///
    /// Reaching the limit counts as a timeout even if the child exited.
    fn finished(status: ExitStatus, elapsed: Duration, limit: Duration) -> Self {
        if elapsed >= limit {
            ExitOutcome::TimedOut
        } else {
            Self::from_status(status)
        }
    }

    /// Outcome after a failed wait, given how terminating the child went.
    fn wait_failed(termination: ExitOutcome, error: &std::io::Error) -> Self {
        match termination {
            ExitOutcome::Unkillable => ExitOutcome::Unkillable,
            _ => ExitOutcome::WaitFailed(error.to_string()),
        }
    }

    fn from_status(status: ExitStatus) -> Self {
        if status.success() {
            ExitOutcome::Success
        } else {
            ExitOutcome::Failed {
                code: status.code(),
            }
        }
    }
}

impl fmt::Display for ExitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitOutcome::Success => write!(f, "succeeded"),
            ExitOutcome::Failed { code: Some(code) } => write!(f, "failed with exit code {}", code),
            ExitOutcome::Failed { code: None } => write!(f, "terminated by signal"),
            ExitOutcome::TimedOut => write!(f, "timed out and was killed"),
            ExitOutcome::Unkillable => write!(f, "timed out and could not be terminated"),
            ExitOutcome::SpawnFailed(e) => write!(f, "could not be started: {}", e),
            ExitOutcome::WaitFailed(e) => write!(f, "could not be waited on: {}", e),
        }
    }
}

/// Outcome plus wall-clock duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub outcome: ExitOutcome,
    pub elapsed: Duration,
}

/// How long to wait for a signalled child to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillPolicy {
    /// First non-zero poll delay; later polls double it.
    pub poll_base: Duration,
    /// Number of polls after each signal.
    pub poll_attempts: u32,
}

impl Default for KillPolicy {
    fn default() -> Self {
        Self {
            poll_base: Duration::from_millis(500),
            poll_attempts: 5,
        }
    }
}

/// Runs one command at a time under a hard deadline.
#[derive(Debug)]
pub struct ProcessRunner {
    output: OutputSink,
    policy: KillPolicy,
    /// A child that survived SIGKILL on an earlier run.
    lingering: Option<ChildGuard>,
}

impl ProcessRunner {
    pub fn new(output: OutputSink, policy: KillPolicy) -> Self {
        Self {
            output,
            policy,
            lingering: None,
        }
    }

    pub fn set_policy(&mut self, policy: KillPolicy) {
        self.policy = policy;
    }

    /// Whether an earlier child is still alive after being killed.
    /// Whether a child that survived SIGKILL is still unreaped.
    pub fn has_lingering_child(&mut self) -> bool {
        if self.lingering.as_mut().is_some_and(|guard| guard.try_reap()) {
            self.lingering = None;
        }
        self.lingering.is_some()
    }

    /// Run `spec`, allowing it at most `limit` of wall-clock time.
    pub async fn run(&mut self, spec: &CommandSpec, limit: Duration) -> RunReport {
        let started = Instant::now();

        if !self.reap_lingering().await {
            tracing::error!(
                label = %spec.label,
                pid = ?self.lingering.as_ref().and_then(|g| g.pid()),
                "Previous child still alive after SIGKILL, refusing to start another"
            );
            return RunReport {
                outcome: ExitOutcome::Unkillable,
                elapsed: started.elapsed(),
            };
        }

        let command_line = spec.command_line();
        let (stdout, stderr) = match self.output.open(&spec.label, &command_line) {
            Ok(handles) => handles,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to open command output sink, discarding output");
                (Stdio::null(), Stdio::null())
            }
        };

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(stdout)
            .stderr(stderr)
            .kill_on_drop(true);

        #[cfg(unix)]
        // SAFETY: only async-signal-safe libc calls run between fork and exec.
        unsafe {
            command.pre_exec(|| {
                // Own process group so termination reaches every descendant
                libc::setpgid(0, 0);
                // Die with the supervisor even if it is SIGKILLed
                #[cfg(target_os = "linux")]
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
                Ok(())
            });
        }

        let child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(label = %spec.label, command = %command_line, error = %e, "Failed to spawn command");
                return RunReport {
                    outcome: ExitOutcome::SpawnFailed(e.to_string()),
                    elapsed: started.elapsed(),
                };
            }
        };

        let mut guard = ChildGuard::new(child);
        tracing::debug!(label = %spec.label, pid = ?guard.pid(), command = %command_line, ?limit, "Command started");

        let waited = tokio::time::timeout(limit, guard.wait()).await;
        let outcome = match waited {
            Ok(Ok(status)) => {
                let outcome = ExitOutcome::finished(status, started.elapsed(), limit);
                if outcome == ExitOutcome::TimedOut {
                    tracing::debug!(label = %spec.label, "Command exited at the deadline, counting as timeout");
                }
                outcome
            }
            Ok(Err(e)) => {
                tracing::error!(label = %spec.label, error = %e, "Failed waiting for command, terminating it");
                let termination = self.terminate(guard, &spec.label).await;
                ExitOutcome::wait_failed(termination, &e)
            }
            Err(_) => {
                tracing::warn!(label = %spec.label, ?limit, "Command exceeded its time limit, terminating");
                self.terminate(guard, &spec.label).await
            }
        };

        RunReport {
            outcome,
            elapsed: started.elapsed(),
        }
    }

    /// SIGTERM, poll, SIGKILL, poll. Keeps the child if it survives both.
    async fn terminate(&mut self, mut guard: ChildGuard, label: &str) -> ExitOutcome {
        for signal in [Signal::Terminate, Signal::Kill] {
            guard.signal(signal);
            if self.poll_exit(&mut guard).await {
                tracing::info!(label, ?signal, "Timed-out command terminated");
                return ExitOutcome::TimedOut;
            }
            tracing::warn!(label, ?signal, "Command still running after signal");
        }

        tracing::error!(label, pid = ?guard.pid(), "Lost control of child process: still alive after SIGKILL");
        self.lingering = Some(guard);
        ExitOutcome::Unkillable
    }

    async fn poll_exit(&self, guard: &mut ChildGuard) -> bool {
        for delay in poll_schedule(self.policy.poll_base, self.policy.poll_attempts) {
            tokio::time::sleep(delay).await;
            if guard.try_reap() {
                return true;
            }
        }
        false
    }

    /// Re-kill and reap a lingering child. Returns `true` when none remains.
    async fn reap_lingering(&mut self) -> bool {
        let Some(mut guard) = self.lingering.take() else {
            return true;
        };
        guard.signal(Signal::Kill);
        if self.poll_exit(&mut guard).await {
            tracing::info!(pid = ?guard.pid(), "Lingering child process finally exited");
            true
        } else {
            self.lingering = Some(guard);
            false
        }
    }
}

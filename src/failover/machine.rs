//! Failover state machine.
//!
//! # Responsibilities
//! - Decide the initial mode from the access link at startup
//! - Run one supervised sync (and optional write probe) per cycle
//! - Repoint the link and notify on transitions
//! - Pace cycles, skipping one sleep right after failback
//!
//! # Design Decisions
//! - Sequential: at most one child process is in flight at any time
//! - The link is repointed only after the triggering outcome is known
//! - Failback needs two confirmations: a dry-run recovery probe and a
//!   successful reconciliation sync
//! - Repoint failures never end the process; the next cycle retries
//! - Shutdown cancels the current cycle, which kills its child

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{broadcast, mpsc};

use crate::config::SupervisorConfig;
use crate::failover::state::{Mode, SupervisorState};
use crate::health::{evaluate, ProbeAttempt, Verdict, WriteProbe};
use crate::link::{LinkController, LinkError, Resolution, Role};
use crate::notify::{EventKind, Notifier, TransitionEvent};
use crate::observability::metrics;
use crate::process::{ExitOutcome, KillPolicy, OutputSink, ProcessRunner};
use crate::resilience::timeouts::run_blocking;
use crate::sync::{SyncAttempt, SyncRequest, SyncTool};

/// Settings that may change on config reload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tunables {
    pub sync_tool: SyncTool,
    pub sync_timeout: Duration,
    pub interval: Duration,
    pub probe: Option<WriteProbe>,
    pub kill_policy: KillPolicy,
}

impl Tunables {
    pub fn from_config(config: &SupervisorConfig) -> Self {
        Self {
            sync_tool: SyncTool::from_config(&config.sync),
            sync_timeout: Duration::from_millis(config.sync.timeout_ms),
            interval: Duration::from_millis(config.sync.interval_ms),
            probe: WriteProbe::from_config(&config.probe),
            kill_policy: KillPolicy {
                poll_base: Duration::from_millis(config.runner.kill_poll_base_ms),
                poll_attempts: config.runner.kill_poll_attempts,
            },
        }
    }
}

/// Startup failures. All of them end the process.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("access link {path} is unusable: {source}")]
    Link { path: PathBuf, source: io::Error },

    #[error("secondary directory {path} is unusable: {reason}")]
    Secondary { path: PathBuf, reason: String },

    #[error("access link {link} resolves to {target}, which is neither the primary nor the secondary")]
    Foreign { link: PathBuf, target: PathBuf },

    #[error("could not point the access link at the secondary: {0}")]
    Repoint(#[from] LinkError),
}

/// Summary of one cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub cycle: u64,
    pub mode_before: Mode,
    pub verdict: Verdict,
    pub mode_after: Mode,
}

/// Owns the mode, the link and the single process runner.
pub struct Supervisor {
    config: SupervisorConfig,
    link: LinkController,
    runner: ProcessRunner,
    tunables: Tunables,
    notifier: Arc<dyn Notifier>,
    pretend: bool,
    state: SupervisorState,
    reloads: Option<mpsc::UnboundedReceiver<SupervisorConfig>>,
}

impl Supervisor {
    pub fn new(config: SupervisorConfig, notifier: Arc<dyn Notifier>) -> Self {
        let pretend = config.runtime.pretend;
        let paths = &config.paths;
        let link = LinkController::new(
            paths.link.clone(),
            paths.primary.clone(),
            paths.secondary.clone(),
        )
        .pretend(pretend);
        let output = OutputSink::from_path(
            config.observability.command_output.as_deref(),
            config.observability.timestamp_output,
        );
        let tunables = Tunables::from_config(&config);
        let runner = ProcessRunner::new(output, tunables.kill_policy);

        Self {
            config,
            link,
            runner,
            tunables,
            notifier,
            pretend,
            state: SupervisorState::new(Mode::Normal),
            reloads: None,
        }
    }

    /// Receive reloaded configurations; applied at the start of each cycle.
    pub fn with_reloads(mut self, reloads: mpsc::UnboundedReceiver<SupervisorConfig>) -> Self {
        self.reloads = Some(reloads);
        self
    }

    pub fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.state.mode()
    }

    pub fn link(&self) -> &LinkController {
        &self.link
    }

    pub fn tunables(&self) -> &Tunables {
        &self.tunables
    }

    /// One bounded resolution of the access link.
    pub async fn resolve_link(&self) -> Resolution {
        self.link.resolve(self.tunables.sync_timeout).await
    }

    /// Determine the initial mode. Must succeed before [`Supervisor::run`].
    pub async fn bootstrap(&mut self) -> Result<Mode, BootstrapError> {
        let link_path = self.link.link().to_path_buf();
        self.link
            .inspect_entry()
            .await
            .map_err(|source| BootstrapError::Link {
                path: link_path.clone(),
                source,
            })?;
        self.check_secondary().await?;

        let mode = match self.resolve_link().await {
            Resolution::Points(Role::Primary) => {
                tracing::info!(link = %link_path.display(), "Access link points at primary, starting in normal mode");
                Mode::Normal
            }
            Resolution::Points(Role::Secondary) => {
                tracing::warn!(link = %link_path.display(), "Started already degraded: access link points at secondary");
                Mode::Failover
            }
            Resolution::Foreign(target) => {
                return Err(BootstrapError::Foreign {
                    link: link_path,
                    target,
                });
            }
            Resolution::Unresolved(reason) => {
                tracing::warn!(link = %link_path.display(), %reason, "Started already degraded: access link unresolvable, forcing failover");
                self.link.repoint(Role::Secondary).await?;
                self.transition(
                    Mode::Failover,
                    EventKind::Failover,
                    format!("access link could not be resolved at startup: {}", reason),
                );
                return Ok(Mode::Failover);
            }
        };

        self.state = SupervisorState::new(mode);
        metrics::record_mode(mode);
        Ok(mode)
    }

    async fn check_secondary(&self) -> Result<(), BootstrapError> {
        let path = self.link.target(Role::Secondary).to_path_buf();
        let probe_path = path.clone();
        let reason = match run_blocking(self.tunables.sync_timeout, move || {
            std::fs::metadata(probe_path)
        })
        .await
        {
            Ok(Ok(meta)) if meta.is_dir() => return Ok(()),
            Ok(Ok(_)) => "not a directory".to_string(),
            Ok(Err(e)) => e.to_string(),
            Err(e) => e.to_string(),
        };
        Err(BootstrapError::Secondary { path, reason })
    }

    /// Run cycles until `shutdown` fires.
    pub async fn run(&mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            mode = %self.state.mode(),
            interval = ?self.tunables.interval,
            sync_timeout = ?self.tunables.sync_timeout,
            pretend = self.pretend,
            "Supervision loop starting"
        );

        loop {
            tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::info!("Shutdown requested during cycle, terminating in-flight command");
                    break;
                }
                report = self.run_cycle() => {
                    tracing::debug!(?report, "Cycle complete");
                }
            }

            match self.state.take_sleep(self.tunables.interval) {
                Some(delay) => {
                    tokio::select! {
                        biased;
                        _ = shutdown.recv() => {
                            tracing::info!("Shutdown requested");
                            break;
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                None => tracing::info!("Skipping sleep to catch up on changes made during the outage"),
            }
        }

        tracing::info!(
            mode = %self.state.mode(),
            cycles = self.state.cycles(),
            "Supervision loop stopped"
        );
    }

    /// One sync → evaluate → transition pass. Does not sleep.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.apply_reloads();
        let cycle = self.state.begin_cycle();
        let mode = self.state.mode();

        let request = match mode {
            Mode::Normal => SyncRequest::replicate(),
            Mode::Failover => SyncRequest::recovery_probe(),
        };
        let sync = self.sync(request).await;
        let probe = if sync.succeeded() {
            self.write_probe().await
        } else {
            None
        };

        let verdict = evaluate(mode, &sync.outcome, probe.as_ref().map(|p| &p.outcome));
        tracing::debug!(cycle, %mode, ?verdict, "Cycle evaluated");

        match verdict {
            Verdict::StayHealthy => {}
            Verdict::StayDegraded => {
                tracing::info!(cycle, "Primary still unavailable, remaining in failover");
            }
            Verdict::Failover => {
                let reason = failure_reason(&sync, probe.as_ref());
                self.fail_over(reason).await;
            }
            Verdict::Failback => self.fail_back().await,
        }

        CycleReport {
            cycle,
            mode_before: mode,
            verdict,
            mode_after: self.state.mode(),
        }
    }

    async fn sync(&mut self, request: SyncRequest) -> SyncAttempt {
        let request = request.with_dry_run(self.pretend);
        let spec = self.tunables.sync_tool.command(
            &request,
            self.link.target(Role::Primary),
            self.link.target(Role::Secondary),
        );

        let report = self.runner.run(&spec, self.tunables.sync_timeout).await;
        let attempt = SyncAttempt {
            request,
            outcome: report.outcome,
            elapsed: report.elapsed,
        };
        metrics::record_sync(request.label(), &attempt.outcome, attempt.elapsed);

        match &attempt.outcome {
            ExitOutcome::Success => {
                tracing::debug!(attempt = %attempt.describe(), "Sync attempt succeeded");
            }
            ExitOutcome::Unkillable => {
                tracing::error!(attempt = %attempt.describe(), "Lost control of sync process, manual cleanup may be required");
            }
            _ if self.state.mode() == Mode::Failover => {
                tracing::info!(attempt = %attempt.describe(), "Sync attempt failed");
            }
            _ => {
                tracing::warn!(attempt = %attempt.describe(), "Sync attempt failed");
            }
        }
        attempt
    }

    async fn write_probe(&mut self) -> Option<ProbeAttempt> {
        let probe = self.tunables.probe.clone()?;
        if self.pretend {
            tracing::info!("Pretend: skipping write probe");
            return None;
        }

        let report = self.runner.run(&probe.spec(), probe.timeout()).await;
        metrics::record_probe(&report.outcome, report.elapsed);
        match &report.outcome {
            ExitOutcome::Success => tracing::debug!(elapsed = ?report.elapsed, "Write probe succeeded"),
            ExitOutcome::Unkillable => {
                tracing::error!("Lost control of write probe process, manual cleanup may be required")
            }
            outcome => tracing::warn!(%outcome, "Write probe failed"),
        }

        Some(ProbeAttempt {
            outcome: report.outcome,
            elapsed: report.elapsed,
        })
    }

    async fn fail_over(&mut self, reason: String) {
        tracing::warn!(%reason, "Primary unhealthy, failing over to secondary");
        match self.link.repoint(Role::Secondary).await {
            Ok(()) => self.transition(Mode::Failover, EventKind::Failover, reason),
            Err(e) => {
                metrics::record_repoint_failure();
                tracing::error!(error = %e, "Failover repoint failed, manual intervention likely required; retrying next cycle");
            }
        }
    }

    async fn fail_back(&mut self) {
        tracing::info!("Primary reachable again, reconciling secondary changes before failback");
        let reconcile = self.sync(SyncRequest::reconcile()).await;
        if !reconcile.succeeded() {
            tracing::warn!(attempt = %reconcile.describe(), "Reconciliation failed, remaining in failover");
            return;
        }

        match self.link.repoint(Role::Primary).await {
            Ok(()) => {
                self.transition(
                    Mode::Normal,
                    EventKind::Failback,
                    "primary recovered and changes made on the secondary were reconciled",
                );
                self.state.request_fast_retry();
            }
            Err(e) => {
                metrics::record_repoint_failure();
                tracing::error!(error = %e, "Failback repoint failed, manual intervention likely required; retrying next cycle");
            }
        }
    }

    fn transition(&mut self, mode: Mode, kind: EventKind, reason: impl Into<String>) {
        self.state.enter(mode);
        metrics::record_mode(mode);
        metrics::record_transition(kind);

        let event = TransitionEvent::new(
            kind,
            self.link.link().to_path_buf(),
            self.link.target(mode.link_role()).to_path_buf(),
            reason,
        );
        match kind {
            EventKind::Failover => {
                tracing::warn!(target = %event.target.display(), reason = %event.reason, "Failover complete")
            }
            EventKind::Failback => {
                tracing::info!(target = %event.target.display(), reason = %event.reason, "Failback complete")
            }
        }
        self.notifier.notify(&event);
    }

    fn apply_reloads(&mut self) {
        let Some(reloads) = self.reloads.as_mut() else {
            return;
        };
        let mut latest = None;
        while let Ok(config) = reloads.try_recv() {
            latest = Some(config);
        }
        let Some(new) = latest else {
            return;
        };

        if new.paths != self.config.paths {
            tracing::warn!("Path changes require a restart, ignoring them");
        }
        if new.notify != self.config.notify
            || new.observability != self.config.observability
            || new.runtime != self.config.runtime
        {
            tracing::warn!("Notification, logging and runtime changes require a restart, ignoring them");
        }

        let tunables = Tunables::from_config(&new);
        if tunables == self.tunables {
            return;
        }
        self.runner.set_policy(tunables.kill_policy);
        self.tunables = tunables;
        self.config.sync = new.sync;
        self.config.probe = new.probe;
        self.config.runner = new.runner;
        tracing::info!(
            interval = ?self.tunables.interval,
            sync_timeout = ?self.tunables.sync_timeout,
            probe = self.tunables.probe.is_some(),
            "Applied reloaded tunables"
        );
    }
}

fn failure_reason(sync: &SyncAttempt, probe: Option<&ProbeAttempt>) -> String {
    match probe {
        Some(probe) if sync.succeeded() => format!(
            "write probe {} after {:.1}s",
            probe.outcome,
            probe.elapsed.as_secs_f64()
        ),
        _ => sync.describe(),
    }
}

//! Directory sync tool invocation.
//!
//! The tool is treated as a black box taking rsync-compatible flags:
//!
//! | request          | flags                          |
//! |------------------|--------------------------------|
//! | mirror           | `--archive --delete`           |
//! | update existing  | `--archive --update --existing`|
//! | dry run          | adds `--dry-run`               |
//!
//! Sources and destinations get a trailing slash so directory contents are
//! synced, not the directory itself.

use std::ffi::OsString;
use std::fmt;
use std::path::Path;

use crate::config::SyncConfig;
use crate::link::Role;
use crate::process::CommandSpec;

/// Which way data flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    PrimaryToSecondary,
    SecondaryToPrimary,
}

impl Direction {
    pub fn source(&self) -> Role {
        match self {
            Direction::PrimaryToSecondary => Role::Primary,
            Direction::SecondaryToPrimary => Role::Secondary,
        }
    }

    pub fn destination(&self) -> Role {
        match self {
            Direction::PrimaryToSecondary => Role::Secondary,
            Direction::SecondaryToPrimary => Role::Primary,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}->{}", self.source(), self.destination())
    }
}

/// What the tool should do at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Make the destination identical, deleting extra files.
    Mirror,
    /// Only update files that already exist at the destination.
    UpdateExisting,
}

/// Why a sync runs; fixed at construction, unaffected by dry-run forcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    Replicate,
    RecoveryProbe,
    Reconcile,
}

impl SyncKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Replicate => "replicate",
            SyncKind::RecoveryProbe => "recovery-probe",
            SyncKind::Reconcile => "reconcile",
        }
    }
}

/// One requested sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncRequest {
    pub kind: SyncKind,
    pub direction: Direction,
    pub mode: SyncMode,
    pub dry_run: bool,
}

impl SyncRequest {
    /// Normal-mode replication of the primary onto the secondary.
    pub fn replicate() -> Self {
        Self {
            kind: SyncKind::Replicate,
            direction: Direction::PrimaryToSecondary,
            mode: SyncMode::Mirror,
            dry_run: false,
        }
    }

    /// Failover-mode check that the primary is readable again.
    pub fn recovery_probe() -> Self {
        Self {
            kind: SyncKind::RecoveryProbe,
            dry_run: true,
            ..Self::replicate()
        }
    }

    /// Copy modifications made on the secondary back before failback.
    pub fn reconcile() -> Self {
        Self {
            kind: SyncKind::Reconcile,
            direction: Direction::SecondaryToPrimary,
            mode: SyncMode::UpdateExisting,
            dry_run: false,
        }
    }

    /// Short name used for logs, metrics and output markers.
    pub fn label(&self) -> &'static str {
        self.kind.as_str()
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = self.dry_run || dry_run;
        self
    }
}

/// Builds sync tool command lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTool {
    program: String,
    extra_args: Vec<String>,
}

impl SyncTool {
    pub fn new(program: impl Into<String>, extra_args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            extra_args,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(config.program.clone(), config.extra_args.clone())
    }

    pub fn command(&self, request: &SyncRequest, primary: &Path, secondary: &Path) -> CommandSpec {
        let path_for = |role: Role| match role {
            Role::Primary => primary,
            Role::Secondary => secondary,
        };

        let mut flags = vec!["--archive"];
        match request.mode {
            SyncMode::Mirror => flags.push("--delete"),
            SyncMode::UpdateExisting => flags.extend(["--update", "--existing"]),
        }
        if request.dry_run {
            flags.push("--dry-run");
        }

        CommandSpec::new(request.label(), &self.program)
            .args(&self.extra_args)
            .args(flags)
            .arg(dir_arg(path_for(request.direction.source())))
            .arg(dir_arg(path_for(request.direction.destination())))
    }
}

fn dir_arg(path: &Path) -> OsString {
    let mut arg = path.as_os_str().to_os_string();
    if !arg.to_string_lossy().ends_with('/') {
        arg.push("/");
    }
    arg
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(request: SyncRequest) -> String {
        SyncTool::new("rsync", vec!["--timeout=30".into()])
            .command(&request, Path::new("/mnt/nfs/data"), Path::new("/var/lib/data/"))
            .command_line()
    }

    #[test]
    fn replicate_mirrors_with_delete() {
        assert_eq!(
            line(SyncRequest::replicate()),
            "rsync --timeout=30 --archive --delete /mnt/nfs/data/ /var/lib/data/"
        );
    }

    #[test]
    fn recovery_probe_is_dry_run_of_normal_direction() {
        assert_eq!(
            line(SyncRequest::recovery_probe()),
            "rsync --timeout=30 --archive --delete --dry-run /mnt/nfs/data/ /var/lib/data/"
        );
    }

    #[test]
    fn reconcile_never_deletes_or_adds() {
        let cmd = line(SyncRequest::reconcile());
        assert_eq!(
            cmd,
            "rsync --timeout=30 --archive --update --existing /var/lib/data/ /mnt/nfs/data/"
        );
        assert!(!cmd.contains("--delete"));
    }

    #[test]
    fn pretend_forces_dry_run_but_never_clears_it() {
        assert!(SyncRequest::reconcile().with_dry_run(true).dry_run);
        assert!(SyncRequest::recovery_probe().with_dry_run(false).dry_run);
        assert!(!SyncRequest::replicate().with_dry_run(false).dry_run);
    }

    #[test]
    fn labels() {
        assert_eq!(SyncRequest::replicate().label(), "replicate");
        assert_eq!(SyncRequest::recovery_probe().label(), "recovery-probe");
        assert_eq!(SyncRequest::reconcile().label(), "reconcile");
    }

    #[test]
    fn forced_dry_run_keeps_the_label() {
        let pretend = SyncRequest::replicate().with_dry_run(true);
        assert!(pretend.dry_run);
        assert_eq!(pretend.label(), "replicate");
        assert_eq!(SyncRequest::reconcile().with_dry_run(true).label(), "reconcile");
    }
}

//! Access link inspection and repointing.
//!
//! # Responsibilities
//! - Classify where the access link currently resolves
//! - Repoint the link to the primary or secondary directory
//!
//! # Design Decisions
//! - Resolution runs on the blocking pool under a deadline, since following
//!   the link into a hung mount can block indefinitely
//! - The secondary is compared first so a link already on the secondary
//!   never touches the primary's filesystem
//! - Repointing is remove-then-create on one blocking-pool thread, so a
//!   cancelled caller never leaves the pair half done; either half failing
//!   is reported and the link may be left missing until the next attempt

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::resilience::timeouts::run_blocking;

/// Which of the two configured directories a path belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Primary,
    Secondary,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Primary => "primary",
            Role::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the access link resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Resolves to one of the configured directories.
    Points(Role),
    /// Resolves, but to neither configured directory.
    Foreign(PathBuf),
    /// Could not be resolved (dangling, I/O error, or deadline exceeded).
    Unresolved(String),
}

impl Resolution {
    /// The role the link points at, if any.
    pub fn role(&self) -> Option<Role> {
        match self {
            Resolution::Points(role) => Some(*role),
            _ => None,
        }
    }
}

/// Failure to repoint the access link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("failed to remove link {path}: {source}")]
    Remove { path: PathBuf, source: io::Error },

    #[error("failed to create link {path} -> {target}: {source}")]
    Create {
        path: PathBuf,
        target: PathBuf,
        source: io::Error,
    },

    #[error("link update task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Sole writer of the access link.
#[derive(Debug, Clone)]
pub struct LinkController {
    link: PathBuf,
    primary: PathBuf,
    secondary: PathBuf,
    pretend: bool,
}

impl LinkController {
    pub fn new(link: PathBuf, primary: PathBuf, secondary: PathBuf) -> Self {
        Self {
            link,
            primary,
            secondary,
            pretend: false,
        }
    }

    /// Log repoints instead of performing them.
    pub fn pretend(mut self, pretend: bool) -> Self {
        self.pretend = pretend;
        self
    }

    pub fn link(&self) -> &Path {
        &self.link
    }

    pub fn target(&self, role: Role) -> &Path {
        match role {
            Role::Primary => &self.primary,
            Role::Secondary => &self.secondary,
        }
    }

    /// Check that the link entry itself exists and is a symbolic link.
    ///
    /// Only the link's own directory entry is inspected, never its target.
    pub async fn inspect_entry(&self) -> io::Result<()> {
        let meta = tokio::fs::symlink_metadata(&self.link).await?;
        if meta.file_type().is_symlink() {
            Ok(())
        } else {
            Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} is not a symbolic link", self.link.display()),
            ))
        }
    }

    /// Resolve the link, giving up after `budget`.
    pub async fn resolve(&self, budget: Duration) -> Resolution {
        let link = self.link.clone();
        let primary = self.primary.clone();
        let secondary = self.secondary.clone();

        match run_blocking(budget, move || classify(&link, &primary, &secondary)).await {
            Ok(resolution) => resolution,
            Err(e) => Resolution::Unresolved(e.to_string()),
        }
    }

    /// Point the link at `role`'s directory.
    ///
    /// Repointing to the current target leaves the link as it was.
    pub async fn repoint(&self, role: Role) -> Result<(), LinkError> {
        let target = self.target(role).to_path_buf();

        if self.pretend {
            tracing::info!(link = %self.link.display(), target = %target.display(), "Pretend: would repoint link");
            return Ok(());
        }

        // The blocking task runs to completion even if this future is dropped.
        let link = self.link.clone();
        let swap_target = target.clone();
        tokio::task::spawn_blocking(move || swap_link(&link, &swap_target)).await??;

        tracing::info!(link = %self.link.display(), target = %target.display(), role = %role, "Link repointed");
        Ok(())
    }
}

fn swap_link(link: &Path, target: &Path) -> Result<(), LinkError> {
    match std::fs::remove_file(link) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(link = %link.display(), "Link was already missing before repoint");
        }
        Err(source) => {
            return Err(LinkError::Remove {
                path: link.to_path_buf(),
                source,
            })
        }
    }

    std::os::unix::fs::symlink(target, link).map_err(|source| LinkError::Create {
        path: link.to_path_buf(),
        target: target.to_path_buf(),
        source,
    })
}

fn classify(link: &Path, primary: &Path, secondary: &Path) -> Resolution {
    let resolved = match std::fs::canonicalize(link) {
        Ok(path) => path,
        Err(e) => return Resolution::Unresolved(e.to_string()),
    };

    if std::fs::canonicalize(secondary).is_ok_and(|s| s == resolved) {
        return Resolution::Points(Role::Secondary);
    }
    if std::fs::canonicalize(primary).is_ok_and(|p| p == resolved) {
        return Resolution::Points(Role::Primary);
    }
    Resolution::Foreign(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::fs::symlink;

    struct Dirs {
        _root: tempfile::TempDir,
        controller: LinkController,
    }

    fn dirs() -> Dirs {
        let root = tempfile::tempdir().unwrap();
        let primary = root.path().join("primary");
        let secondary = root.path().join("secondary");
        let link = root.path().join("current");
        std::fs::create_dir(&primary).unwrap();
        std::fs::create_dir(&secondary).unwrap();
        symlink(&primary, &link).unwrap();
        let controller = LinkController::new(link, primary, secondary);
        Dirs {
            _root: root,
            controller,
        }
    }

    const BUDGET: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn resolves_primary_and_secondary() {
        let d = dirs();
        assert_eq!(d.controller.resolve(BUDGET).await, Resolution::Points(Role::Primary));

        d.controller.repoint(Role::Secondary).await.unwrap();
        assert_eq!(d.controller.resolve(BUDGET).await, Resolution::Points(Role::Secondary));
    }

    #[tokio::test]
    async fn repeated_repoint_is_stable() {
        let d = dirs();
        for _ in 0..3 {
            d.controller.repoint(Role::Secondary).await.unwrap();
        }
        assert_eq!(
            std::fs::read_link(d.controller.link()).unwrap(),
            d.controller.target(Role::Secondary)
        );
        assert_eq!(d.controller.resolve(BUDGET).await, Resolution::Points(Role::Secondary));
    }

    #[tokio::test]
    async fn dangling_link_is_unresolved() {
        let d = dirs();
        std::fs::remove_dir(d.controller.target(Role::Primary)).unwrap();
        assert!(matches!(
            d.controller.resolve(BUDGET).await,
            Resolution::Unresolved(_)
        ));
    }

    #[tokio::test]
    async fn foreign_target_is_reported() {
        let d = dirs();
        let elsewhere = d._root.path().join("elsewhere");
        std::fs::create_dir(&elsewhere).unwrap();
        std::fs::remove_file(d.controller.link()).unwrap();
        symlink(&elsewhere, d.controller.link()).unwrap();

        let resolution = d.controller.resolve(BUDGET).await;
        assert_eq!(resolution, Resolution::Foreign(elsewhere.canonicalize().unwrap()));
        assert_eq!(resolution.role(), None);
    }

    #[tokio::test]
    async fn repoint_recreates_missing_link() {
        let d = dirs();
        std::fs::remove_file(d.controller.link()).unwrap();
        d.controller.repoint(Role::Primary).await.unwrap();
        assert_eq!(d.controller.resolve(BUDGET).await, Resolution::Points(Role::Primary));
    }

    #[tokio::test]
    async fn pretend_leaves_link_untouched() {
        let d = dirs();
        let controller = d.controller.clone().pretend(true);
        controller.repoint(Role::Secondary).await.unwrap();
        assert_eq!(controller.resolve(BUDGET).await, Resolution::Points(Role::Primary));
    }

    #[tokio::test]
    async fn inspect_entry_rejects_plain_directory() {
        let d = dirs();
        let plain = LinkController::new(
            d.controller.target(Role::Primary).to_path_buf(),
            d.controller.target(Role::Primary).to_path_buf(),
            d.controller.target(Role::Secondary).to_path_buf(),
        );
        assert!(d.controller.inspect_entry().await.is_ok());
        assert!(plain.inspect_entry().await.is_err());
    }

    #[tokio::test]
    async fn cancelled_repoint_still_completes() {
        let d = dirs();

        // Poll once, then drop the future mid-flight.
        let _ = tokio::time::timeout(Duration::ZERO, d.controller.repoint(Role::Secondary)).await;

        let mut resolution = d.controller.resolve(BUDGET).await;
        for _ in 0..100 {
            if resolution == Resolution::Points(Role::Secondary) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
            resolution = d.controller.resolve(BUDGET).await;
        }
        assert_eq!(resolution, Resolution::Points(Role::Secondary));
        assert!(std::fs::symlink_metadata(d.controller.link())
            .unwrap()
            .file_type()
            .is_symlink());
    }
}

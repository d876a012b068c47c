//! Scoped ownership of a running child process.
//!
//! A [`ChildGuard`] kills the child's whole process group when dropped unless
//! the child has already been reaped. Dropping happens on every exit path:
//! normal return, cancellation of the supervising future on shutdown, and
//! unwinding.

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;

/// Termination signals sent to a supervised process group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Graceful termination (SIGTERM).
    Terminate,
    /// Forceful kill (SIGKILL).
    Kill,
}

/// Owns a spawned child until it is confirmed dead.
#[derive(Debug)]
pub struct ChildGuard {
    child: Child,
    /// Process group id; equal to the child's pid since it leads its own group.
    pgid: Option<u32>,
    reaped: bool,
}

impl ChildGuard {
    pub fn new(child: Child) -> Self {
        let pgid = child.id();
        Self {
            child,
            pgid,
            reaped: false,
        }
    }

    pub fn pid(&self) -> Option<u32> {
        self.pgid
    }

    /// Wait for the child to exit on its own.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.reaped = true;
        Ok(status)
    }

    /// Non-blocking check for exit. Returns `true` once the child is reaped.
    pub fn try_reap(&mut self) -> bool {
        if self.reaped {
            return true;
        }
        match self.child.try_wait() {
            Ok(Some(_)) => {
                self.reaped = true;
                true
            }
            Ok(None) => false,
            Err(e) => {
                tracing::warn!(pid = ?self.pgid, error = %e, "Failed to poll child status");
                false
            }
        }
    }

    /// Send `signal` to the child's process group.
    pub fn signal(&mut self, signal: Signal) {
        if self.reaped {
            return;
        }

        #[cfg(unix)]
        if let Some(pgid) = self.pgid {
            let raw = match signal {
                Signal::Terminate => libc::SIGTERM,
                Signal::Kill => libc::SIGKILL,
            };
            tracing::debug!(pgid, ?signal, "Signalling process group");
            // SAFETY: killpg has no memory-safety preconditions; pgid comes
            // from a child we spawned as a group leader and have not reaped.
            unsafe {
                libc::killpg(pgid as libc::pid_t, raw);
            }
        }

        if signal == Signal::Kill {
            let _ = self.child.start_kill();
        }
    }
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        if !self.try_reap() {
            tracing::warn!(pid = ?self.pgid, "Killing child process still running at release");
            self.signal(Signal::Kill);
        }
    }
}

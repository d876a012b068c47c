//! Failover and failback notifications.
//!
//! # Data Flow
//! ```text
//! state machine transition
//!     → TransitionEvent
//!     → Notifier::notify (returns immediately)
//!     → mail.rs spawns the mail command in the background
//! ```
//!
//! # Design Decisions
//! - Delivery is best effort; failures are logged and never reach the
//!   state machine
//! - The trait is synchronous so the state machine never awaits delivery

pub mod mail;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::config::NotifyConfig;

pub use mail::MailNotifier;

/// Kind of transition being reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Failover,
    Failback,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Failover => f.write_str("failover"),
            EventKind::Failback => f.write_str("failback"),
        }
    }
}

/// A completed mode transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionEvent {
    pub kind: EventKind,
    pub link: PathBuf,
    /// Directory the link points at after the transition.
    pub target: PathBuf,
    pub reason: String,
    pub at: DateTime<Local>,
}

impl TransitionEvent {
    pub fn new(kind: EventKind, link: PathBuf, target: PathBuf, reason: impl Into<String>) -> Self {
        Self {
            kind,
            link,
            target,
            reason: reason.into(),
            at: Local::now(),
        }
    }

    pub fn subject(&self) -> String {
        format!(
            "[linkguard] {}: {} -> {}",
            self.kind,
            self.link.display(),
            self.target.display()
        )
    }

    pub fn body(&self) -> String {
        let host = hostname();
        format!(
            "Host: {}\nTime: {}\nEvent: {}\nLink: {}\nNow pointing at: {}\nReason: {}\n",
            host,
            self.at.format("%Y-%m-%d %H:%M:%S %z"),
            self.kind,
            self.link.display(),
            self.target.display(),
            self.reason
        )
    }
}

fn hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|name| name.into_string().ok())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Errors from a single delivery attempt.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to start mail command: {0}")]
    Spawn(std::io::Error),

    #[error("failed to write message body: {0}")]
    Body(std::io::Error),

    #[error("mail command exited with {0}")]
    Exit(std::process::ExitStatus),

    #[error("mail command did not finish within {0:?}")]
    TimedOut(std::time::Duration),
}

/// Fire-and-forget event sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, event: &TransitionEvent);
}

/// Notifier that only logs; used when no recipients are configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &TransitionEvent) {
        tracing::info!(kind = %event.kind, subject = %event.subject(), "Notification (no recipients configured)");
    }
}

/// Build the notifier described by `config`.
pub fn from_config(config: &NotifyConfig, pretend: bool) -> Arc<dyn Notifier> {
    if config.recipients.is_empty() {
        Arc::new(LogNotifier)
    } else {
        Arc::new(MailNotifier::from_config(config).pretend(pretend))
    }
}

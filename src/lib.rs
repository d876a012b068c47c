//! linkguard: keeps an access symlink pointed at a healthy replica.
//!
//! Consumers read and write through one symlink. While the preferred
//! (usually remote) primary is healthy, the link points at it and the
//! primary is mirrored into a local secondary. When a sync or write probe
//! fails, the link is swung to the secondary. Once the primary answers
//! again, changes made during the outage are copied back and the link
//! returns to the primary.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌──────────────────────── failover::Supervisor ────────────────────────┐
//!   │                                                                       │
//!   │   sync::SyncTool ──┐                                                  │
//!   │                    ├─▶ process::ProcessRunner ─▶ ExitOutcome ─┐       │
//!   │ health::WriteProbe ┘     (one bounded child at a time)        │       │
//!   │                                                               ▼       │
//!   │                                            health::evaluate ─▶ Verdict│
//!   │                                                               │       │
//!   │        link::LinkController ◀── repoint ──────────────────────┤       │
//!   │        notify::Notifier    ◀── transition event ──────────────┘       │
//!   └───────────────────────────────────────────────────────────────────────┘
//!
//!   Cross-cutting: config (TOML + CLI + reload), lifecycle (signals,
//!   shutdown, detach), observability (tracing, metrics), resilience
//!   (backoff, bounded blocking calls)
//! ```

// Core subsystems
pub mod failover;
pub mod health;
pub mod link;
pub mod process;
pub mod sync;

// Outbound
pub mod notify;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use config::schema::SupervisorConfig;
pub use failover::{Mode, Supervisor};
pub use lifecycle::Shutdown;

//! Synchronization between the primary and secondary directories.
//!
//! # Data Flow
//! ```text
//! Mode::Normal   → SyncRequest::replicate()       (primary → secondary, mirror)
//! Mode::Failover → SyncRequest::recovery_probe()  (same, dry run)
//! Failback       → SyncRequest::reconcile()       (secondary → primary, update existing)
//!     → tool.rs builds the CommandSpec
//!     → process runner executes it
//!     → attempt.rs records the outcome
//! ```

pub mod attempt;
pub mod tool;

pub use attempt::SyncAttempt;
pub use tool::{Direction, SyncKind, SyncMode, SyncRequest, SyncTool};

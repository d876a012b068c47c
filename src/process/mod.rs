//! Supervised external processes.
//!
//! # Data Flow
//! ```text
//! CommandSpec (program + args + label)
//!     → runner.rs (spawn in own process group, output → output.rs sink)
//!     → bounded wait on guard.rs handle
//!     → on deadline: SIGTERM, poll, SIGKILL, poll
//!     → RunReport { ExitOutcome, elapsed }
//! ```
//!
//! # Design Decisions
//! - One child at a time; the runner is owned by the state machine
//! - Cleanup is tied to the guard's lifetime, not to signal traps

pub mod guard;
pub mod output;
pub mod runner;

pub use output::OutputSink;
pub use runner::{CommandSpec, ExitOutcome, KillPolicy, ProcessRunner, RunReport};

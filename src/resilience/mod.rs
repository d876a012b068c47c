//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Child process that ignores SIGTERM:
//!     → backoff.rs (poll schedule before escalating to SIGKILL)
//!
//! Blocking filesystem call against a possibly hung mount:
//!     → timeouts.rs (run on the blocking pool under a deadline)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - A timed-out blocking call is abandoned, never joined

pub mod backoff;
pub mod timeouts;

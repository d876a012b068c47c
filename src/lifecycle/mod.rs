//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Detach (daemon.rs):
//!     fork → setsid → fork → chdir / → stdio to /dev/null
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger shutdown
//!     SIGHUP → Trigger config reload
//!
//! Shutdown (shutdown.rs):
//!     Trigger → supervisor cancels its cycle → in-flight child killed → Exit
//! ```
//!
//! # Design Decisions
//! - Detaching happens before the async runtime starts
//! - SIGHUP triggers config reload, not shutdown

pub mod daemon;
pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;

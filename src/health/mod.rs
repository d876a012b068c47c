//! Health evaluation subsystem.
//!
//! # Data Flow
//! ```text
//! sync attempt outcome ─┐
//!                       ├→ evaluator.rs (pure decision table) → Verdict
//! write probe outcome ──┘      (probe.rs builds the probe command)
//! ```
//!
//! # Design Decisions
//! - The evaluator knows nothing about links, processes or time
//! - The write probe only ever targets the primary

pub mod evaluator;
pub mod probe;

pub use evaluator::{evaluate, Verdict};
pub use probe::{ProbeAttempt, WriteProbe};

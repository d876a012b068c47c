//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log sink (stderr or a log file)
//!     → Metrics endpoint (Prometheus scrape, opt-in)
//! ```
//!
//! # Design Decisions
//! - Log level configurable via config, `--verbose` and `RUST_LOG`
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

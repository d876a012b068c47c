//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply command-line overrides)
//!     → validation.rs (semantic checks)
//!     → SupervisorConfig (validated, immutable)
//!     → owned by the failover state machine
//!
//! On file change or SIGHUP:
//!     watcher.rs reloads through the same loader + validation
//!     → new SupervisorConfig sent over a channel
//!     → state machine applies tunables at the start of the next cycle
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes arrive as whole new values
//! - All fields have defaults except the three paths
//! - Validation separates syntactic (serde) from semantic checks
//! - Paths, logging and recipients only change on restart

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError, Overrides};
pub use schema::{
    NotifyConfig, ObservabilityConfig, PathsConfig, ProbeConfig, RunnerConfig, RuntimeConfig,
    SupervisorConfig, SyncConfig,
};
pub use validation::ValidationError;
pub use watcher::{ConfigReloader, ConfigWatcher};

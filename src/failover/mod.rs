//! Failover/failback orchestration.
//!
//! # Data Flow
//! ```text
//! bootstrap:
//!     link entry + secondary exist?
//!     → bounded link resolution
//!     → primary: Normal | secondary: Failover | unresolvable: repoint + Failover
//!     | foreign: fatal
//!
//! each cycle:
//!     sync (replicate or recovery probe) → write probe (if sync ok)
//!     → health::evaluate
//!     → Failover: repoint → secondary, notify
//!     → Failback: reconcile → repoint → primary, notify, skip next sleep
//!     → sleep interval
//! ```

pub mod machine;
pub mod state;

pub use machine::{BootstrapError, CycleReport, Supervisor, Tunables};
pub use state::{Mode, SupervisorState};

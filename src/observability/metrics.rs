//! Metrics collection and exposition.
//!
//! # Metrics
//! - `linkguard_sync_attempts_total` (counter): sync runs by kind, outcome
//! - `linkguard_probe_attempts_total` (counter): write probes by outcome
//! - `linkguard_attempt_duration_seconds` (histogram): run durations by kind
//! - `linkguard_transitions_total` (counter): failovers and failbacks
//! - `linkguard_repoint_failures_total` (counter): failed link repoints
//! - `linkguard_unkillable_children_total` (counter): children surviving SIGKILL
//! - `linkguard_mode` (gauge): 0=normal, 1=failover
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - The Prometheus endpoint is opt-in

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::failover::Mode;
use crate::notify::EventKind;
use crate::process::ExitOutcome;

/// Install the Prometheus recorder and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_sync(kind: &'static str, outcome: &ExitOutcome, elapsed: Duration) {
    counter!("linkguard_sync_attempts_total", "kind" => kind, "outcome" => outcome.as_str())
        .increment(1);
    histogram!("linkguard_attempt_duration_seconds", "kind" => kind).record(elapsed.as_secs_f64());
    record_unkillable(outcome);
}

pub fn record_probe(outcome: &ExitOutcome, elapsed: Duration) {
    counter!("linkguard_probe_attempts_total", "outcome" => outcome.as_str()).increment(1);
    histogram!("linkguard_attempt_duration_seconds", "kind" => "write-probe")
        .record(elapsed.as_secs_f64());
    record_unkillable(outcome);
}

pub fn record_transition(kind: EventKind) {
    let label = match kind {
        EventKind::Failover => "failover",
        EventKind::Failback => "failback",
    };
    counter!("linkguard_transitions_total", "kind" => label).increment(1);
}

pub fn record_repoint_failure() {
    counter!("linkguard_repoint_failures_total").increment(1);
}

pub fn record_mode(mode: Mode) {
    let value = match mode {
        Mode::Normal => 0.0,
        Mode::Failover => 1.0,
    };
    gauge!("linkguard_mode").set(value);
}

fn record_unkillable(outcome: &ExitOutcome) {
    if *outcome == ExitOutcome::Unkillable {
        counter!("linkguard_unkillable_children_total").increment(1);
    }
}

//! Metrics collection for the signal agent.
//!
//! Prometheus-compatible counters and gauges with typed convenience
//! functions. All label values come from internal enums or numeric phase
//! ids, never from detector payloads.

use std::sync::atomic::{AtomicBool, Ordering};

use metrics::{counter, describe_counter, describe_gauge, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::GreenwaveError;
use crate::phase::PhaseId;

/// Guard to prevent double-initialization of the metrics recorder.
static METRICS_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Initializes the global metrics recorder.
///
/// When `port` is `Some`, a Prometheus HTTP listener is started on
/// `127.0.0.1:<port>`. When `None`, the recorder is installed without an
/// HTTP endpoint.
///
/// # Errors
///
/// Returns `GreenwaveError::Io` if the recorder or HTTP listener cannot
/// be installed (e.g. port already in use).
pub fn init_metrics(port: Option<u16>) -> Result<(), GreenwaveError> {
    if METRICS_INITIALIZED.swap(true, Ordering::SeqCst) {
        tracing::debug!("metrics already initialized, skipping");
        return Ok(());
    }
    port.map_or_else(
        || PrometheusBuilder::new().install_recorder().map(|_| ()),
        |p| {
            PrometheusBuilder::new()
                .with_http_listener(([127, 0, 0, 1], p))
                .install()
        },
    )
    .map_err(|e| GreenwaveError::Io(std::io::Error::other(e.to_string())))?;

    describe_metrics();
    Ok(())
}

/// Registers metric descriptions with the global recorder.
fn describe_metrics() {
    describe_counter!(
        "greenwave_observations_total",
        "Observations received from detectors"
    );
    describe_counter!(
        "greenwave_decode_errors_total",
        "Observation payloads discarded as malformed"
    );
    describe_counter!(
        "greenwave_oracle_errors_total",
        "Decision cycles skipped due to oracle failure"
    );
    describe_counter!("greenwave_decisions_total", "Oracle decisions by target phase");
    describe_counter!(
        "greenwave_phase_transitions_total",
        "Completed phase transitions by from/to phase"
    );
    describe_counter!(
        "greenwave_transitions_rejected_total",
        "Transition requests declined, by reason"
    );
    describe_counter!(
        "greenwave_command_failures_total",
        "Lamp commands that failed to deliver, by transition stage"
    );
    describe_gauge!("greenwave_current_phase", "Currently active phase id");
    describe_gauge!(
        "greenwave_connections_active",
        "Number of connected detectors"
    );
}

/// Records one received detector observation.
pub fn record_observation() {
    counter!("greenwave_observations_total").increment(1);
}

/// Records a discarded malformed payload.
pub fn record_decode_error() {
    counter!("greenwave_decode_errors_total").increment(1);
}

/// Records a decision cycle skipped because the oracle failed.
pub fn record_oracle_error() {
    counter!("greenwave_oracle_errors_total").increment(1);
}

/// Records an oracle decision.
pub fn record_decision(target: PhaseId) {
    counter!("greenwave_decisions_total", "target" => target.to_string()).increment(1);
}

/// Records a completed phase transition.
pub fn record_phase_transition(from: PhaseId, to: PhaseId) {
    counter!(
        "greenwave_phase_transitions_total",
        "from" => from.to_string(),
        "to" => to.to_string(),
    )
    .increment(1);
}

/// Records a declined transition request.
pub fn record_transition_rejected(reason: &'static str) {
    counter!("greenwave_transitions_rejected_total", "reason" => reason).increment(1);
}

/// Records a lamp command delivery failure.
///
/// `stage` is `"yellow"` or `"green"` depending on which leg of the
/// transition failed.
pub fn record_command_failure(stage: &'static str) {
    counter!("greenwave_command_failures_total", "stage" => stage).increment(1);
}

/// Sets the currently active phase gauge.
pub fn set_current_phase(phase: PhaseId) {
    gauge!("greenwave_current_phase").set(f64::from(phase.0));
}

/// Sets the number of connected detectors.
#[allow(clippy::cast_precision_loss)]
pub fn set_connections_active(count: u64) {
    gauge!("greenwave_connections_active").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        // metrics macros silently no-op when no global recorder is installed
        record_observation();
        record_decode_error();
        record_oracle_error();
        record_decision(PhaseId(2));
        record_phase_transition(PhaseId(0), PhaseId(2));
        record_transition_rejected("min_green_unmet");
        record_command_failure("yellow");
        set_current_phase(PhaseId(4));
        set_connections_active(3);
    }
}

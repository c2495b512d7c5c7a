//! Configuration schema types.
//!
//! These types are deserialized from the YAML configuration file. Table
//! consistency is enforced later, when the intersection section is turned
//! into a [`PhasePlan`](crate::phase::PhasePlan).

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::phase::PhaseId;

/// Root configuration for a greenwave agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Intersection geometry: phases and their tables.
    pub intersection: IntersectionConfig,

    /// Dwell and cadence timing.
    pub timing: TimingConfig,

    /// Detector-facing listener.
    pub listener: ListenerConfig,

    /// Controller-facing client.
    pub controller: ControllerConfig,

    /// Decision policy selection.
    pub oracle: OracleConfig,

    /// Detector payload shape.
    pub detector: DetectorConfig,
}

// ============================================================================
// Intersection
// ============================================================================

/// Phase tables for one intersection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntersectionConfig {
    /// Phase active at startup (must be green).
    pub initial_phase: PhaseId,

    /// Ordered green-phase sequence; the legal decision targets.
    pub green_sequence: Vec<PhaseId>,

    /// Mandatory yellow interphase entered when leaving each green phase.
    pub yellow_of: IndexMap<PhaseId, PhaseId>,

    /// Per-phase lamp command strings (`G`/`y`/`r`, one char per lane).
    pub lamps: IndexMap<PhaseId, String>,
}

// ============================================================================
// Timing
// ============================================================================

/// Dwell and cadence timing, in whole seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Shortest duration a green phase must be held before a transition
    /// away from it may be requested.
    pub min_green_secs: u64,

    /// Duration of the yellow interphase.
    pub yellow_secs: u64,

    /// Pause between decision cycles on each detector connection,
    /// decoupling detector write rate from decision rate.
    #[serde(default = "default_decision_interval_secs")]
    pub decision_interval_secs: u64,
}

const fn default_decision_interval_secs() -> u64 {
    1
}

// ============================================================================
// Listener / Controller endpoints
// ============================================================================

/// Detector-facing listener endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListenerConfig {
    /// Bind host.
    pub host: String,

    /// Bind port.
    pub port: u16,

    /// Upper bound on a single detector read.
    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl ListenerConfig {
    /// The bind address as `host:port`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

const fn default_max_payload_bytes() -> usize {
    1024
}

/// Controller-facing client endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Controller host.
    pub host: String,

    /// Controller port.
    pub port: u16,

    /// Timeout for opening a command connection.
    #[serde(default = "default_channel_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Timeout for the acknowledgment read.
    #[serde(default = "default_channel_timeout_secs")]
    pub response_timeout_secs: u64,

    /// What to do with the logical phase when a command send fails.
    #[serde(default)]
    pub on_send_failure: SendFailurePolicy,
}

impl ControllerConfig {
    /// The controller address as `host:port`.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

const fn default_channel_timeout_secs() -> u64 {
    2
}

/// Policy for a failed lamp command send.
///
/// Applies to the yellow command at the head of a transition. Once yellow
/// has been commanded the sequence always runs to completion; there is no
/// safe rollback out of an interphase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SendFailurePolicy {
    /// Advance the logical phase anyway and let the next controller
    /// health check reconcile.
    #[default]
    Advance,
    /// Abort the transition while still green; the request is rejected
    /// and may be retried by a later decision cycle.
    Hold,
}

// ============================================================================
// Oracle
// ============================================================================

/// Decision policy selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Algorithm identifier: `longest_queue`, `round_robin`, or `linear`.
    pub algorithm: String,

    /// Model artifact path, required by artifact-backed algorithms.
    #[serde(default)]
    pub model_path: Option<PathBuf>,
}

// ============================================================================
// Detector
// ============================================================================

/// Detector payload shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Number of sensor features in a raw observation vector.
    pub raw_feature_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL_YAML: &str = r#"
intersection:
  initial_phase: 0
  green_sequence: [0, 1]
  yellow_of:
    0: 2
    1: 3
  lamps:
    0: "GGrr"
    1: "rrGG"
    2: "yyrr"
    3: "rryy"
timing:
  min_green_secs: 10
  yellow_secs: 3
listener:
  host: "0.0.0.0"
  port: 50052
controller:
  host: "127.0.0.1"
  port: 50051
oracle:
  algorithm: longest_queue
detector:
  raw_feature_count: 8
"#;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config: AgentConfig = serde_yaml::from_str(MINIMAL_YAML).unwrap();
        assert_eq!(config.intersection.initial_phase, PhaseId(0));
        assert_eq!(config.intersection.green_sequence.len(), 2);
        assert_eq!(
            config.intersection.yellow_of.get(&PhaseId(1)),
            Some(&PhaseId(3))
        );
        assert_eq!(config.timing.decision_interval_secs, 1);
        assert_eq!(config.listener.max_payload_bytes, 1024);
        assert_eq!(config.controller.connect_timeout_secs, 2);
        assert_eq!(config.controller.on_send_failure, SendFailurePolicy::Advance);
        assert_eq!(config.listener.addr(), "0.0.0.0:50052");
        assert_eq!(config.controller.addr(), "127.0.0.1:50051");
    }

    #[test]
    fn parses_send_failure_policy() {
        let yaml = MINIMAL_YAML.replace(
            "  port: 50051",
            "  port: 50051\n  on_send_failure: hold",
        );
        let config: AgentConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(config.controller.on_send_failure, SendFailurePolicy::Hold);
    }
}

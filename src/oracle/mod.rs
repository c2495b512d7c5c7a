//! Decision oracle: maps an observation to a target green phase.
//!
//! The core treats the policy as a pure function with unspecified latency;
//! a prediction error is handled like a decode failure for that cycle.
//! Concrete policies are selected by the `oracle.algorithm` configuration
//! key and injected at startup.

use std::sync::Arc;

use tracing::info;

use crate::config::schema::OracleConfig;
use crate::error::OracleError;
use crate::ingress::observation::Observation;
use crate::phase::PhaseId;

/// Algorithm identifiers accepted in configuration.
pub const KNOWN_ALGORITHMS: [&str; 3] = ["longest_queue", "round_robin", "linear"];

/// A decision policy. Deterministic given its internal state.
pub trait DecisionOracle: Send + Sync {
    /// Picks the target green phase for one observation.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if the observation shape does not match
    /// what the policy expects.
    fn predict(&self, observation: &Observation) -> Result<PhaseId, OracleError>;

    /// Identifier of the policy, for logs and events.
    fn name(&self) -> &'static str;
}

/// Builds the configured policy.
///
/// # Errors
///
/// Returns an [`OracleError`] for an unknown algorithm id or an unusable
/// model artifact.
pub fn from_config(
    config: &OracleConfig,
    greens: Vec<PhaseId>,
) -> Result<Arc<dyn DecisionOracle>, OracleError> {
    let oracle: Arc<dyn DecisionOracle> = match config.algorithm.as_str() {
        "longest_queue" => Arc::new(LongestQueueOracle::new(greens)),
        "round_robin" => Arc::new(RoundRobinOracle::new(greens)),
        "linear" => {
            let path = config
                .model_path
                .as_ref()
                .ok_or_else(|| OracleError::ModelRequired {
                    algorithm: config.algorithm.clone(),
                })?;
            Arc::new(LinearOracle::load(path, greens)?)
        }
        other => return Err(OracleError::UnknownAlgorithm(other.to_string())),
    };
    info!(algorithm = oracle.name(), "decision oracle ready");
    Ok(oracle)
}

/// Index of the largest value, `None` if nothing comparable remains.
///
/// NaN entries are skipped so a partially corrupt vector still yields a
/// deterministic pick.
fn argmax(values: impl Iterator<Item = f32>) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, v) in values.enumerate() {
        if v.is_nan() {
            continue;
        }
        if best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

// ============================================================================
// Longest queue
// ============================================================================

/// Picks the green phase whose share of the raw feature vector sums
/// highest.
///
/// Raw features are split into one contiguous chunk per green phase (the
/// detector reports lane measurements grouped by approach), and the chunk
/// with the largest total wins.
pub struct LongestQueueOracle {
    greens: Vec<PhaseId>,
}

impl LongestQueueOracle {
    /// Creates the policy over the ordered green sequence.
    #[must_use]
    pub const fn new(greens: Vec<PhaseId>) -> Self {
        Self { greens }
    }
}

impl DecisionOracle for LongestQueueOracle {
    fn predict(&self, observation: &Observation) -> Result<PhaseId, OracleError> {
        if self.greens.is_empty() {
            return Err(OracleError::NoCandidate);
        }
        let raw = observation.raw_features();
        if raw.is_empty() {
            return Err(OracleError::DimensionMismatch {
                got: 0,
                expected: self.greens.len(),
            });
        }
        let chunk = raw.len().div_ceil(self.greens.len());
        let winner = argmax(raw.chunks(chunk).map(|c| c.iter().sum::<f32>()))
            .ok_or(OracleError::NoCandidate)?;
        Ok(self.greens[winner.min(self.greens.len() - 1)])
    }

    fn name(&self) -> &'static str {
        "longest_queue"
    }
}

// ============================================================================
// Round robin
// ============================================================================

/// Cycles to the next green phase after the one currently encoded in the
/// observation's one-hot head.
pub struct RoundRobinOracle {
    greens: Vec<PhaseId>,
}

impl RoundRobinOracle {
    /// Creates the policy over the ordered green sequence.
    #[must_use]
    pub const fn new(greens: Vec<PhaseId>) -> Self {
        Self { greens }
    }
}

impl DecisionOracle for RoundRobinOracle {
    fn predict(&self, observation: &Observation) -> Result<PhaseId, OracleError> {
        if self.greens.is_empty() {
            return Err(OracleError::NoCandidate);
        }
        let current = observation
            .current_green_index()
            .ok_or(OracleError::NoCurrentPhase)?;
        Ok(self.greens[(current + 1) % self.greens.len()])
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

// ============================================================================
// Linear
// ============================================================================

/// Linear scoring policy: one weight row per green phase, dotted with the
/// full feature vector; the highest score wins.
///
/// The model artifact is a JSON array of per-green weight rows, each row
/// as long as the full observation vector.
#[derive(Debug)]
pub struct LinearOracle {
    greens: Vec<PhaseId>,
    weights: Vec<Vec<f32>>,
}

impl LinearOracle {
    /// Loads weight rows from a JSON artifact.
    ///
    /// # Errors
    ///
    /// Returns an [`OracleError`] if the file cannot be read or parsed,
    /// or if the row count does not match the green sequence.
    pub fn load(path: &std::path::Path, greens: Vec<PhaseId>) -> Result<Self, OracleError> {
        let raw = std::fs::read_to_string(path).map_err(|e| OracleError::ModelLoad {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let weights: Vec<Vec<f32>> =
            serde_json::from_str(&raw).map_err(|e| OracleError::ModelLoad {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        if weights.len() != greens.len() {
            return Err(OracleError::DimensionMismatch {
                got: weights.len(),
                expected: greens.len(),
            });
        }
        Ok(Self { greens, weights })
    }

    fn score(row: &[f32], features: &[f32]) -> f32 {
        row.iter().zip(features).map(|(w, x)| w * x).sum()
    }
}

impl DecisionOracle for LinearOracle {
    fn predict(&self, observation: &Observation) -> Result<PhaseId, OracleError> {
        let features = observation.features();
        for row in &self.weights {
            if row.len() != features.len() {
                return Err(OracleError::DimensionMismatch {
                    got: features.len(),
                    expected: row.len(),
                });
            }
        }
        let winner = argmax(self.weights.iter().map(|row| Self::score(row, features)))
            .ok_or(OracleError::NoCandidate)?;
        Ok(self.greens[winner])
    }

    fn name(&self) -> &'static str {
        "linear"
    }
}

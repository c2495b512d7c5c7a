//! Configuration validation.
//!
//! Semantic validation on the fully deserialized [`AgentConfig`].
//! Validation collects ALL issues rather than stopping at the first, so
//! one `validate` run gives complete feedback. Phase table consistency is
//! delegated to [`PhasePlan`] construction so the checks can never drift
//! from what the runtime actually enforces.

use crate::config::schema::AgentConfig;
use crate::error::{Severity, ValidationIssue};
use crate::oracle;
use crate::phase::PhasePlan;

/// Result of configuration validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Configuration validator.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates a configuration and returns all issues found.
    pub fn validate(&mut self, config: &AgentConfig) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_intersection(config);
        self.validate_timing(config);
        self.validate_endpoints(config);
        self.validate_oracle(config);
        self.validate_detector(config);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    fn validate_intersection(&mut self, config: &AgentConfig) {
        if let Err(e) = PhasePlan::from_config(&config.intersection) {
            self.add_error("intersection", &e.to_string());
        }

        for (phase, lamp) in &config.intersection.lamps {
            if let Some(bad) = lamp.chars().find(|c| !matches!(c, 'G' | 'y' | 'r')) {
                self.add_error(
                    &format!("intersection.lamps[{phase}]"),
                    &format!("invalid lamp color '{bad}' (expected G, y, or r)"),
                );
            }
        }
    }

    fn validate_timing(&mut self, config: &AgentConfig) {
        if config.timing.yellow_secs == 0 {
            self.add_error(
                "timing.yellow_secs",
                "yellow interphase duration must be positive",
            );
        }
        if config.timing.min_green_secs == 0 {
            self.add_warning(
                "timing.min_green_secs",
                "minimum green of zero disables dwell enforcement",
            );
        }
        if config.timing.decision_interval_secs == 0 {
            self.add_warning(
                "timing.decision_interval_secs",
                "a zero decision interval couples decisions to detector write rate",
            );
        }
    }

    fn validate_endpoints(&mut self, config: &AgentConfig) {
        if config.listener.host.is_empty() {
            self.add_error("listener.host", "listener host cannot be empty");
        }
        if config.controller.host.is_empty() {
            self.add_error("controller.host", "controller host cannot be empty");
        }
        if config.listener.max_payload_bytes == 0 {
            self.add_error(
                "listener.max_payload_bytes",
                "payload buffer cannot be empty",
            );
        }
    }

    fn validate_oracle(&mut self, config: &AgentConfig) {
        if !oracle::KNOWN_ALGORITHMS.contains(&config.oracle.algorithm.as_str()) {
            self.add_error(
                "oracle.algorithm",
                &format!(
                    "unknown algorithm '{}' (expected one of: {})",
                    config.oracle.algorithm,
                    oracle::KNOWN_ALGORITHMS.join(", ")
                ),
            );
        }
        if config.oracle.algorithm == "linear" && config.oracle.model_path.is_none() {
            self.add_error(
                "oracle.model_path",
                "the linear policy requires a model artifact path",
            );
        }
    }

    fn validate_detector(&mut self, config: &AgentConfig) {
        if config.detector.raw_feature_count == 0 {
            self.add_error(
                "detector.raw_feature_count",
                "raw feature count must be positive",
            );
        }
    }

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

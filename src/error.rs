//! Error types for greenwave
//!
//! Domain-specific error enums aggregated by [`GreenwaveError`], which maps
//! every failure to a Unix exit code. Runtime faults on the detector and
//! controller legs are handled locally by the owning component; the variants
//! here cover startup, configuration, and the few paths that do surface.

use std::path::PathBuf;
use thiserror::Error;

use crate::phase::PhaseId;

// ============================================================================
// Exit Codes
// ============================================================================

/// Exit codes for greenwave CLI operations.
///
/// These codes follow Unix conventions.
pub struct ExitCode;

impl ExitCode {
    /// Successful execution
    pub const SUCCESS: i32 = 0;

    /// General error
    pub const ERROR: i32 = 1;

    /// Configuration error (invalid YAML, validation failure)
    pub const CONFIG_ERROR: i32 = 2;

    /// I/O error (file not found, permission denied)
    pub const IO_ERROR: i32 = 3;

    /// Network error on either the detector or controller leg
    pub const TRANSPORT_ERROR: i32 = 4;

    /// Phase plan error (inconsistent transition or lamp tables)
    pub const PHASE_ERROR: i32 = 5;

    /// Decision oracle error (unknown algorithm, bad model artifact)
    pub const ORACLE_ERROR: i32 = 6;

    /// Usage error (invalid arguments, missing required options)
    pub const USAGE_ERROR: i32 = 64;

    /// Interrupted by SIGINT (Ctrl+C)
    pub const INTERRUPTED: i32 = 130;

    /// Terminated by SIGTERM
    pub const TERMINATED: i32 = 143;
}

// ============================================================================
// Top-Level Error
// ============================================================================

/// Top-level error type for greenwave operations.
///
/// Aggregates all domain-specific errors and provides a unified interface
/// for error handling and exit code mapping.
#[derive(Debug, Error)]
pub enum GreenwaveError {
    /// Configuration loading or validation error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Controller command channel error
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// Phase plan construction error
    #[error(transparent)]
    Phase(#[from] PhaseError),

    /// Detector ingress error
    #[error(transparent)]
    Ingress(#[from] IngressError),

    /// Decision oracle error
    #[error(transparent)]
    Oracle(#[from] OracleError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl GreenwaveError {
    /// Returns the appropriate exit code for this error.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Yaml(_) => ExitCode::CONFIG_ERROR,
            Self::Channel(_) | Self::Ingress(_) => ExitCode::TRANSPORT_ERROR,
            Self::Phase(_) => ExitCode::PHASE_ERROR,
            Self::Oracle(_) => ExitCode::ORACLE_ERROR,
            Self::Io(_) => ExitCode::IO_ERROR,
            Self::Json(_) => ExitCode::ERROR,
        }
    }
}

// ============================================================================
// Configuration Errors
// ============================================================================

/// Configuration loading and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("file not found: {path}")]
    MissingFile {
        /// Path to the missing file
        path: PathBuf,
    },

    /// Configuration file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path to the configuration file
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Configuration file exceeds the size limit
    #[error("{path} is {size} bytes (limit: {limit})")]
    TooLarge {
        /// Path to the configuration file
        path: PathBuf,
        /// Actual file size in bytes
        size: u64,
        /// Configured size limit in bytes
        limit: u64,
    },

    /// YAML parsing failed
    #[error("parse error in {path}: {message}")]
    ParseError {
        /// Path to the configuration file
        path: PathBuf,
        /// Error message from the parser
        message: String,
    },

    /// Configuration validation failed
    #[error("validation failed for {path}")]
    ValidationError {
        /// Path to the configuration file
        path: String,
        /// List of validation issues found
        errors: Vec<ValidationIssue>,
    },
}

// ============================================================================
// Validation Types
// ============================================================================

/// A single validation issue found during configuration validation.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Path to the problematic field (e.g., "intersection.lamps[4]")
    pub path: String,
    /// Description of the validation issue
    pub message: String,
    /// Severity level of the issue
    pub severity: Severity,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {} at {}", prefix, self.message, self.path)
    }
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Validation failure that prevents the configuration from being used
    Error,
    /// Potential issue that does not prevent configuration loading
    Warning,
}

// ============================================================================
// Command Channel Errors
// ============================================================================

/// Controller-facing command channel errors.
///
/// Each command uses a fresh connection; none of these are retried
/// internally and none of them roll back the state machine.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Failed to open a connection to the controller
    #[error("connect to {addr} failed: {source}")]
    Connect {
        /// Controller address
        addr: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Connection attempt exceeded the configured timeout
    #[error("connect to {addr} timed out")]
    ConnectTimeout {
        /// Controller address
        addr: String,
    },

    /// I/O error while writing the command or reading the acknowledgment
    #[error("command I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Controller closed the connection before acknowledging
    #[error("controller closed the connection before acknowledging")]
    ConnectionClosed,

    /// No acknowledgment arrived within the configured timeout
    #[error("timed out waiting for controller acknowledgment")]
    AckTimeout,

    /// Controller answered with something other than the success token
    #[error("controller rejected command: {response:?}")]
    Rejected {
        /// Raw response text
        response: String,
    },

    /// No lamp command is defined for the requested phase
    #[error("no lamp command for phase {0}")]
    UnknownPhase(PhaseId),
}

// ============================================================================
// Phase Plan Errors
// ============================================================================

/// Phase table consistency errors raised while building a
/// [`PhasePlan`](crate::phase::PhasePlan).
#[derive(Debug, Error)]
pub enum PhaseError {
    /// The green sequence is empty
    #[error("green sequence is empty")]
    EmptyGreens,

    /// A phase appears more than once in the green sequence
    #[error("phase {0} appears more than once in the green sequence")]
    DuplicateGreen(PhaseId),

    /// The configured initial phase is not a green phase
    #[error("initial phase {0} is not a green phase")]
    InitialNotGreen(PhaseId),

    /// A green phase has no yellow interphase mapping
    #[error("green phase {0} has no yellow interphase mapping")]
    MissingYellow(PhaseId),

    /// A transition table key is not a green phase
    #[error("transition table key {0} is not a green phase")]
    NonGreenTransitionKey(PhaseId),

    /// A yellow interphase target is itself a green phase
    #[error("interphase for green phase {green} maps to green phase {target}")]
    YellowTargetIsGreen {
        /// The green phase being left
        green: PhaseId,
        /// The offending mapping target
        target: PhaseId,
    },

    /// A phase has no lamp command
    #[error("phase {0} has no lamp command")]
    MissingLamp(PhaseId),

    /// Lamp command lengths differ across phases
    #[error("lamp command for phase {phase} is {got} lanes (expected {expected})")]
    LampLengthMismatch {
        /// The offending phase
        phase: PhaseId,
        /// Actual lamp string length
        got: usize,
        /// Length established by the first lamp entry
        expected: usize,
    },
}

// ============================================================================
// Ingress Errors
// ============================================================================

/// Detector ingress errors.
///
/// Decode failures skip the decision cycle without terminating the
/// connection; only the bind failure is fatal to the process.
#[derive(Debug, Error)]
pub enum IngressError {
    /// Failed to bind the detector-facing listener
    #[error("failed to bind detector listener on {addr}: {source}")]
    Bind {
        /// Listener address
        addr: String,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Payload is not a valid JSON number array
    #[error("malformed observation payload: {0}")]
    Decode(#[from] serde_json::Error),

    /// Payload length matches neither the raw nor the full vector shape
    #[error("unexpected observation length {got} (expected raw {raw} or full {full})")]
    UnexpectedLength {
        /// Number of values received
        got: usize,
        /// Configured raw feature count
        raw: usize,
        /// Full vector length (one-hot + flag + raw)
        full: usize,
    },
}

// ============================================================================
// Oracle Errors
// ============================================================================

/// Decision oracle errors.
///
/// At runtime a prediction error is treated like a decode failure: the
/// cycle is skipped and the connection stays open.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Unrecognized algorithm identifier in configuration
    #[error("unknown decision algorithm '{0}'")]
    UnknownAlgorithm(String),

    /// The selected algorithm needs a model artifact but none was configured
    #[error("algorithm '{algorithm}' requires a model artifact path")]
    ModelRequired {
        /// The algorithm identifier
        algorithm: String,
    },

    /// The model artifact could not be read or parsed
    #[error("failed to load model artifact {path}: {message}")]
    ModelLoad {
        /// Path to the model artifact
        path: PathBuf,
        /// Human-readable failure description
        message: String,
    },

    /// Observation shape does not match what the policy expects
    #[error("feature dimension mismatch: got {got}, expected {expected}")]
    DimensionMismatch {
        /// Number of features received
        got: usize,
        /// Number of features expected
        expected: usize,
    },

    /// The observation carries no recognizable current-phase encoding
    #[error("observation has no current-phase one-hot encoding")]
    NoCurrentPhase,

    /// The policy has no green phase to choose from
    #[error("policy has no candidate green phase")]
    NoCandidate,
}

// ============================================================================
// Result Type Alias
// ============================================================================

/// Result type alias for greenwave operations.
pub type Result<T> = std::result::Result<T, GreenwaveError>;

// ============================================================================
// Tests
// ============================================================================

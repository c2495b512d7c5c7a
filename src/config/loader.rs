//! Configuration loader.
//!
//! Loading pipeline: size-capped read, YAML parse, typed deserialization,
//! validation, freeze behind `Arc`.

use std::path::Path;
use std::sync::Arc;

use crate::config::schema::AgentConfig;
use crate::config::validation::Validator;
use crate::error::{ConfigError, ValidationIssue};

/// Options for the configuration loader.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// Maximum configuration file size in bytes.
    pub max_config_bytes: u64,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            max_config_bytes: env_or("GREENWAVE_MAX_CONFIG_SIZE", 1024 * 1024),
        }
    }
}

/// Reads a numeric override from the environment, falling back to a default.
fn env_or(var: &str, default: u64) -> u64 {
    std::env::var(var)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Result of loading a configuration file.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated configuration.
    pub config: Arc<AgentConfig>,

    /// Warnings encountered during validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Loads a configuration file and returns the frozen configuration.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file is missing, unreadable, too
/// large, not valid YAML, or fails validation.
pub fn load(path: &Path, options: &LoaderOptions) -> Result<LoadResult, ConfigError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::MissingFile {
                path: path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    if metadata.len() > options.max_config_bytes {
        return Err(ConfigError::TooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            limit: options.max_config_bytes,
        });
    }

    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    let config: AgentConfig =
        serde_yaml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let result = Validator::new().validate(&config);
    if !result.is_valid() {
        return Err(ConfigError::ValidationError {
            path: path.display().to_string(),
            errors: result.errors,
        });
    }

    Ok(LoadResult {
        config: Arc::new(config),
        warnings: result.warnings,
    })
}

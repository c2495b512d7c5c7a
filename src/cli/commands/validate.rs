//! The `validate` command: check a configuration file and report issues.

use crate::cli::args::ValidateArgs;
use crate::config::loader::{self, LoaderOptions};
use crate::error::{ConfigError, GreenwaveError};

/// Validates a configuration file without starting the agent.
///
/// Prints every issue found; warnings do not fail the command.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be loaded or has
/// validation errors.
pub fn execute(args: &ValidateArgs) -> Result<(), GreenwaveError> {
    match loader::load(&args.config, &LoaderOptions::default()) {
        Ok(loaded) => {
            for warning in &loaded.warnings {
                println!("{warning}");
            }
            println!(
                "{}: OK ({} green phases, {} lanes, {} warning(s))",
                args.config.display(),
                loaded.config.intersection.green_sequence.len(),
                loaded
                    .config
                    .intersection
                    .lamps
                    .values()
                    .next()
                    .map_or(0, String::len),
                loaded.warnings.len()
            );
            Ok(())
        }
        Err(ConfigError::ValidationError { path, errors }) => {
            for error in &errors {
                println!("{error}");
            }
            println!("{path}: {} error(s)", errors.len());
            Err(ConfigError::ValidationError { path, errors }.into())
        }
        Err(e) => Err(e.into()),
    }
}

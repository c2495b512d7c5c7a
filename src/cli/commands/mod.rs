//! Command dispatch.

pub mod run;
pub mod validate;
pub mod version;

use crate::cli::args::{Cli, Commands};
use crate::error::GreenwaveError;

/// Dispatches the parsed CLI to the matching command handler.
///
/// # Errors
///
/// Propagates whatever the selected command returns.
pub async fn dispatch(cli: Cli) -> Result<(), GreenwaveError> {
    match cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Validate(args) => validate::execute(&args),
        Commands::Version => {
            version::execute();
            Ok(())
        }
    }
}

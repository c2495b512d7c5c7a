//! The `version` command.

/// Prints version information.
pub fn execute() {
    println!("greenwave {}", env!("CARGO_PKG_VERSION"));
}

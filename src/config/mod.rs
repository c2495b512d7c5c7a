//! Configuration: schema types, the loading pipeline, and validation.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{LoadResult, LoaderOptions, load};
pub use schema::AgentConfig;
pub use validation::{ValidationResult, Validator};

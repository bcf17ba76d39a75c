#![forbid(unsafe_code)]

pub mod cli;
pub mod config;
pub mod introspect;
pub mod logging;
pub mod models;
pub mod results;
pub mod sql;
pub mod utils;

pub use cli::app::{Cli, Command};
pub use models::{DatabaseSchema, SchemaValidationResult, ValidationResult};
pub use sql::SqlValidator;

pub mod check;
pub mod query;
pub mod result;
pub mod schema;

use std::path::PathBuf;

use anyhow::{Error, Result};
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::models::{
    DatabaseSchema, QueryEnvelope, SchemaValidationResult, ValidationResult,
};
use crate::sql::SafetyViolation;

/// The input was rejected: unsafe SQL, a schema mismatch or an unusable
/// result. Maps to exit code 2.
#[derive(Debug)]
pub struct ValidationCommandFailure {
    envelope: QueryEnvelope,
}

impl ValidationCommandFailure {
    #[must_use]
    pub fn new(envelope: QueryEnvelope) -> Self {
        Self { envelope }
    }

    #[must_use]
    pub fn envelope(&self) -> &QueryEnvelope {
        &self.envelope
    }
}

impl std::fmt::Display for ValidationCommandFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("validation failed.")?;
        if let Some(error) = &self.envelope.error {
            write!(f, " {}: {}", error.code, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationCommandFailure {}

#[derive(Debug, Clone, Args)]
pub struct SchemaSourceArgs {
    /// JSON file holding a `DatabaseSchema[]` snapshot.
    #[arg(long, value_name = "PATH", conflicts_with = "database")]
    pub schema: Option<PathBuf>,

    /// SQLite database to introspect.
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,
}

pub struct LoadedSchema {
    pub tables: Vec<DatabaseSchema>,
    pub source: String,
}

/// Resolves and loads the schema named on the command line, if any.
pub fn load_schema_source(
    args: &SchemaSourceArgs,
    runtime_paths: &RuntimePaths,
) -> Result<Option<LoadedSchema>> {
    if let Some(path) = &args.schema {
        let path = runtime_paths.resolve(path)?;
        let tables = crate::introspect::load_schema_file(&path)?;
        return Ok(Some(LoadedSchema {
            tables,
            source: path.display().to_string(),
        }));
    }

    if let Some(path) = &args.database {
        let path = runtime_paths.resolve(path)?;
        let connection = crate::introspect::open_read_only(&path)?;
        let tables = crate::introspect::load_database_schema(&connection)?;
        return Ok(Some(LoadedSchema {
            tables,
            source: path.display().to_string(),
        }));
    }

    Ok(None)
}

pub fn sql_rejection(command: &str, violation: &SafetyViolation) -> Error {
    tracing::info!(command, code = violation.code(), "sql rejected");
    let message = violation.to_string();
    let envelope = QueryEnvelope::error(command, violation.code(), &message)
        .with_error_details(json!({ "validation": ValidationResult::rejected(message) }));
    Error::new(ValidationCommandFailure::new(envelope))
}

pub fn schema_rejection(command: &str, result: &SchemaValidationResult) -> Error {
    tracing::info!(command, errors = result.errors.len(), "schema cross-check failed");
    let message = format!(
        "statement does not match the database schema ({} problem(s))",
        result.errors.len()
    );
    let envelope = QueryEnvelope::error(command, "schema_mismatch", message)
        .with_error_details(json!({ "schema_validation": result }));
    Error::new(ValidationCommandFailure::new(envelope))
}

pub fn emit(envelope: &QueryEnvelope) -> Result<()> {
    println!("{}", envelope.encode()?);
    Ok(())
}

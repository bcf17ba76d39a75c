use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{SchemaSourceArgs, emit, load_schema_source, schema_rejection, sql_rejection};
use crate::config::RuntimePaths;
use crate::models::{QueryEnvelope, ValidationResult};
use crate::sql::SqlValidator;

const COMMAND: &str = "check";

#[derive(Debug, Clone, Args)]
pub struct CheckArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,

    #[command(flatten)]
    pub schema_source: SchemaSourceArgs,
}

pub fn run(args: &CheckArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let statement_kind =
        SqlValidator::screen(&args.sql).map_err(|violation| sql_rejection(COMMAND, &violation))?;

    let mut data = json!({
        "statement_kind": statement_kind,
        "validation": ValidationResult::passed(),
    });

    let envelope = match load_schema_source(&args.schema_source, runtime_paths)? {
        None => QueryEnvelope::ok(COMMAND, data).with_meta("schema_checked", json!(false)),
        Some(schema) => {
            let result = SqlValidator::validate_schema(&args.sql, &schema.tables);
            if !result.valid {
                return Err(schema_rejection(COMMAND, &result));
            }
            data["schema_validation"] = json!(result);
            QueryEnvelope::ok(COMMAND, data)
                .with_meta("schema_checked", json!(true))
                .with_meta("schema_source", json!(schema.source))
                .with_meta("schema_tables", json!(schema.tables.len()))
        }
    };

    tracing::info!(statement_kind = statement_kind.key(), "sql accepted");
    emit(&envelope)
}

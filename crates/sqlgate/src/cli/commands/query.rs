use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Error, Result};
use clap::Args;
use serde_json::{Value, json};

use super::{emit, schema_rejection, sql_rejection};
use crate::config::RuntimePaths;
use crate::models::{QueryEnvelope, QueryEnvelopeCommandFailure};
use crate::sql::SqlValidator;

const COMMAND: &str = "query";

#[derive(Debug, Clone, Args)]
pub struct QueryArgs {
    #[arg(value_name = "SQL")]
    pub sql: String,

    /// SQLite database to query; opened read-only.
    #[arg(long, value_name = "PATH")]
    pub database: PathBuf,

    /// Bind parameters as a JSON array of scalars.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,

    #[arg(long, default_value_t = 1_000)]
    pub row_cap: usize,
}

pub fn run(args: &QueryArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let statement_kind =
        SqlValidator::screen(&args.sql).map_err(|violation| sql_rejection(COMMAND, &violation))?;

    if args.row_cap == 0 {
        return Err(runtime_failure(
            "query_row_cap_invalid",
            "row_cap must be greater than zero",
            json!({ "row_cap": args.row_cap }),
        ));
    }

    let params = crate::introspect::parse_query_params(args.params.as_deref()).map_err(|error| {
        runtime_failure(
            "query_params_invalid",
            "invalid query params",
            json!({ "cause": format!("{error:#}") }),
        )
    })?;

    let database = runtime_paths.resolve(&args.database)?;
    let connection = crate::introspect::open_read_only(&database).map_err(|error| {
        runtime_failure(
            "query_database_unavailable",
            "unable to open sqlite database",
            json!({
                "database": database.display().to_string(),
                "cause": format!("{error:#}")
            }),
        )
    })?;

    let tables = crate::introspect::load_database_schema(&connection)?;
    let schema_validation = SqlValidator::validate_schema(&args.sql, &tables);
    if !schema_validation.valid {
        return Err(schema_rejection(COMMAND, &schema_validation));
    }

    let started = Instant::now();
    let result =
        crate::introspect::execute_read_only_query(&connection, &args.sql, &params, args.row_cap)
            .map_err(|error| {
                runtime_failure(
                    "query_execution_failed",
                    "query execution failed",
                    json!({ "cause": format!("{error:#}") }),
                )
            })?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    tracing::info!(
        rows = result.row_count,
        truncated = result.truncated,
        duration_ms,
        "query executed"
    );

    let encoded_result = serde_json::to_value(&result).context("failed to encode query result")?;
    let result_validation = crate::results::validate_query_result(&encoded_result);

    let mut envelope = QueryEnvelope::ok(COMMAND, encoded_result)
        .with_meta("statement_kind", json!(statement_kind))
        .with_meta("database", json!(database.display().to_string()))
        .with_meta("row_count", json!(result.row_count))
        .with_meta("truncated", json!(result.truncated))
        .with_meta("row_cap", json!(args.row_cap))
        .with_meta("duration_ms", json!(duration_ms))
        .with_meta("params_count", json!(params.len()))
        .with_meta("result_validation", json!(result_validation));
    if result.truncated {
        envelope = envelope
            .with_warning("result_truncated", "truncated to row_cap")
            .with_warning_details(json!({ "row_cap": args.row_cap }));
    }
    envelope = envelope
        .with_warnings("result_unusable", result_validation.errors)
        .with_warnings("result_quality", result_validation.warnings);

    emit(&envelope)
}

fn runtime_failure(code: &str, message: &str, details: Value) -> Error {
    tracing::info!(code, "query failed");
    Error::new(QueryEnvelopeCommandFailure::new(
        QueryEnvelope::error(COMMAND, code, message).with_error_details(details),
    ))
}

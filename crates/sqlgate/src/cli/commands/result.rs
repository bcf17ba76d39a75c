use std::path::PathBuf;

use anyhow::{Context, Error, Result};
use clap::Args;
use serde_json::{Value, json};

use super::{ValidationCommandFailure, emit};
use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;
use crate::results::{ChartCleanOptions, clean_chart_data, validate_query_result};

const COMMAND: &str = "result";

#[derive(Debug, Clone, Args)]
pub struct ResultArgs {
    /// JSON file holding a `{ columns, rows }` query result, or a bare row
    /// array when cleaning.
    #[arg(value_name = "JSON")]
    pub input: PathBuf,

    /// Clean the rows for charting instead of validating the result.
    #[arg(long, default_value_t = false)]
    pub clean: bool,

    #[arg(long, default_value_t = 1_000)]
    pub max_rows: usize,

    #[arg(long, default_value_t = false)]
    pub keep_null_rows: bool,

    #[arg(long, default_value_t = 0.5)]
    pub null_threshold: f64,
}

pub fn run(args: &ResultArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let path = runtime_paths.resolve(&args.input)?;
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read query result: {}", path.display()))?;
    let document: Value = serde_json::from_str(&raw)
        .with_context(|| format!("query result is not valid JSON: {}", path.display()))?;

    if args.clean {
        return run_clean(args, &document);
    }

    let validation = validate_query_result(&document);
    tracing::info!(
        valid = validation.is_valid,
        empty = validation.is_empty,
        warnings = validation.warnings.len(),
        "query result validated"
    );
    if !validation.is_valid {
        return Err(rejection(
            "result_invalid",
            &validation.errors,
            json!({ "result_validation": validation }),
        ));
    }

    let envelope = QueryEnvelope::ok(COMMAND, json!(validation))
        .with_meta("input", json!(path.display().to_string()))
        .with_warnings("result_quality", validation.warnings);
    emit(&envelope)
}

fn run_clean(args: &ResultArgs, document: &Value) -> Result<()> {
    let options = ChartCleanOptions {
        remove_null_rows: !args.keep_null_rows,
        null_threshold: args.null_threshold,
        max_rows: args.max_rows,
    };
    // A saved query result is accepted as well as a bare row array.
    let rows = document.get("rows").unwrap_or(document);
    let cleaned = clean_chart_data(rows, &options);
    tracing::info!(
        valid = cleaned.is_valid,
        rows = cleaned.cleaned_data.len(),
        warnings = cleaned.warnings.len(),
        "chart data cleaned"
    );
    if !cleaned.is_valid {
        return Err(rejection(
            "chart_data_invalid",
            &cleaned.errors,
            json!({ "chart_data": cleaned }),
        ));
    }

    let envelope = QueryEnvelope::ok(COMMAND, json!(cleaned))
        .with_meta("max_rows", json!(options.max_rows))
        .with_meta("null_threshold", json!(options.null_threshold))
        .with_meta("remove_null_rows", json!(options.remove_null_rows))
        .with_warnings("chart_data_cleaned", cleaned.warnings);
    emit(&envelope)
}

fn rejection(code: &str, errors: &[String], details: Value) -> Error {
    let message = errors
        .first()
        .cloned()
        .unwrap_or_else(|| "query result rejected".to_string());
    Error::new(ValidationCommandFailure::new(
        QueryEnvelope::error(COMMAND, code, message).with_error_details(details),
    ))
}

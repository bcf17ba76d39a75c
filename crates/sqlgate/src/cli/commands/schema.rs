use std::path::PathBuf;

use anyhow::Result;
use clap::{ArgGroup, Args};
use serde_json::json;

use super::emit;
use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;

const COMMAND: &str = "schema";

#[derive(Debug, Clone, Args)]
#[command(group(ArgGroup::new("source").required(true).args(["database", "contract"])))]
pub struct SchemaArgs {
    /// SQLite database to introspect.
    #[arg(long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Print the JSON Schema of the snapshot format instead.
    #[arg(long, default_value_t = false)]
    pub contract: bool,
}

pub fn run(args: &SchemaArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    if args.contract {
        let contract = crate::models::schema::json_schema()?;
        return emit(&QueryEnvelope::ok(COMMAND, contract).with_meta("kind", json!("contract")));
    }

    let Some(database) = &args.database else {
        anyhow::bail!("pass --database or --contract");
    };
    let path = runtime_paths.resolve(database)?;
    let connection = crate::introspect::open_read_only(&path)?;
    let tables = crate::introspect::load_database_schema(&connection)?;
    tracing::info!(tables = tables.len(), database = %path.display(), "schema snapshot loaded");

    let envelope = QueryEnvelope::ok(COMMAND, json!(tables))
        .with_meta("kind", json!("snapshot"))
        .with_meta("database", json!(path.display().to_string()))
        .with_meta("table_count", json!(tables.len()));
    emit(&envelope)
}

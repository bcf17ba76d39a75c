use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    check::CheckArgs, query::QueryArgs, result::ResultArgs, schema::SchemaArgs,
};

#[derive(Debug, Parser)]
#[command(
    name = "sqlgate",
    version,
    about = "Read-only SQL safety screen and schema cross-check"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Screen a statement and optionally cross-check it against a schema.
    Check(CheckArgs),
    /// Print a database schema snapshot or the snapshot JSON Schema.
    Schema(SchemaArgs),
    /// Validate and run a read-only statement against a SQLite database.
    Query(QueryArgs),
    /// Validate a saved query result or clean it for charting.
    Result(ResultArgs),
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Check(_) => "check",
            Self::Schema(_) => "schema",
            Self::Query(_) => "query",
            Self::Result(_) => "result",
        }
    }
}

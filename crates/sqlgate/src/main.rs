#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use clap::error::ErrorKind;
use sqlgate::cli::app::{Cli, Command, RuntimeArgs};
use sqlgate::cli::commands::{self, ValidationCommandFailure};
use sqlgate::config::RuntimePaths;
use sqlgate::models::{QueryEnvelope, QueryEnvelopeCommandFailure};

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    if let Err(error) = sqlgate::logging::init() {
        eprintln!("sqlgate: {error:#}");
        return EXIT_USAGE_ERROR;
    }

    let command_name = cli.command.name();
    tracing::info!(command = command_name, "starting");

    match execute(cli) {
        Ok(()) => {
            tracing::info!(command = command_name, exit_code = EXIT_SUCCESS, "completed");
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            emit_failure_envelope(command_name, &error);
            eprintln!("sqlgate: failed `{command_name}` (exit_code={exit_code})");
            eprintln!("{error:#}");
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
    match cli.command {
        Command::Check(args) => commands::check::run(&args, &runtime_paths),
        Command::Schema(args) => commands::schema::run(&args, &runtime_paths),
        Command::Query(args) => commands::query::run(&args, &runtime_paths),
        Command::Result(args) => commands::result::run(&args, &runtime_paths),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<ValidationCommandFailure>().is_some() {
        EXIT_VALIDATION_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

/// stdout always carries exactly one envelope, failures included.
fn emit_failure_envelope(command_name: &str, error: &anyhow::Error) {
    let envelope = if let Some(failure) = error.downcast_ref::<ValidationCommandFailure>() {
        failure.envelope().clone()
    } else if let Some(failure) = error.downcast_ref::<QueryEnvelopeCommandFailure>() {
        failure.envelope().clone()
    } else {
        QueryEnvelope::error(command_name, "runtime_failure", format!("{error:#}"))
    };

    match envelope.encode() {
        Ok(encoded) => println!("{encoded}"),
        Err(encode_error) => eprintln!("sqlgate: {encode_error:#}"),
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    sqlgate::config::resolve_runtime_paths(&home_dir, &cwd)
}

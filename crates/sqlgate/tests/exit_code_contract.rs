use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::{Value, json};

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&path).expect("temp dir should be creatable");
    path
}

fn sqlgate(temp: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sqlgate"));
    command
        .arg("--home-dir")
        .arg(temp)
        .arg("--cwd")
        .arg(temp)
        .env_remove("SQLGATE_LOG")
        .env_remove("RUST_LOG");
    command
}

fn read_envelope(output: &Output) -> Value {
    let stdout = String::from_utf8(output.stdout.clone()).expect("stdout should be utf-8");
    let line = stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .expect("stdout should carry an envelope");
    serde_json::from_str(line).expect("envelope should be JSON")
}

fn write_schema_file(path: &Path) {
    let schema = json!([
        {
            "tableName": "users",
            "columns": [
                { "name": "id", "type": "INTEGER", "nullable": false },
                { "name": "name", "type": "TEXT", "nullable": true }
            ]
        }
    ]);
    std::fs::write(path, schema.to_string()).expect("schema file should be writable");
}

fn seed_db(path: &Path) {
    let connection = rusqlite::Connection::open(path).expect("sqlite db should open");
    connection
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT);
             INSERT INTO users (id, name) VALUES (1, 'ada'), (2, 'grace'), (3, 'linus');",
        )
        .expect("fixture should apply");
}

#[test]
fn missing_required_args_exits_with_usage_code() {
    let status = Command::new(env!("CARGO_BIN_EXE_sqlgate"))
        .arg("check")
        .status()
        .expect("command should execute");

    assert_eq!(status.code(), Some(EXIT_USAGE_ERROR));
}

#[test]
fn runtime_path_resolution_failures_exit_with_runtime_code() {
    let output = Command::new(env!("CARGO_BIN_EXE_sqlgate"))
        .args(["--home-dir", "relative", "check", "SELECT 1"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    let envelope = read_envelope(&output);
    assert_eq!(envelope["ok"], json!(false));
    assert_eq!(envelope.pointer("/error/code"), Some(&json!("runtime_failure")));
}

#[test]
fn unsafe_sql_exits_with_validation_code() {
    let temp = unique_temp_dir("sqlgate-exit-unsafe");
    let output = sqlgate(&temp)
        .args(["check", "SELECT 1; DROP TABLE users"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_VALIDATION_FAILURE));
    let envelope = read_envelope(&output);
    assert_eq!(envelope["command"], json!("check"));
    assert_eq!(envelope.pointer("/error/code"), Some(&json!("multiple_statements")));
    assert_eq!(
        envelope.pointer("/error/details/validation/valid"),
        Some(&json!(false))
    );
}

#[test]
fn safe_sql_exits_zero() {
    let temp = unique_temp_dir("sqlgate-exit-success");
    let output = sqlgate(&temp)
        .args(["check", "SELECT 1"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = read_envelope(&output);
    assert_eq!(envelope["ok"], json!(true));
    assert_eq!(envelope.pointer("/data/statement_kind"), Some(&json!("select")));
    assert_eq!(envelope.pointer("/meta/schema_checked"), Some(&json!(false)));
}

#[test]
fn schema_mismatches_exit_with_validation_code() {
    let temp = unique_temp_dir("sqlgate-exit-schema");
    write_schema_file(&temp.join("schema.json"));

    let output = sqlgate(&temp)
        .args(["check", "SELECT nope FROM users", "--schema", "schema.json"])
        .output()
        .expect("command should execute");
    assert_eq!(output.status.code(), Some(EXIT_VALIDATION_FAILURE));
    let envelope = read_envelope(&output);
    assert_eq!(envelope.pointer("/error/code"), Some(&json!("schema_mismatch")));
    assert_eq!(
        envelope.pointer("/error/details/schema_validation/invalidColumns/0/column"),
        Some(&json!("nope"))
    );

    let output = sqlgate(&temp)
        .args(["check", "SELECT u.name FROM users u", "--schema", "schema.json"])
        .output()
        .expect("command should execute");
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    assert_eq!(
        read_envelope(&output).pointer("/data/schema_validation/valid"),
        Some(&json!(true))
    );
}

#[test]
fn query_runs_against_sqlite_and_flags_truncation() {
    let temp = unique_temp_dir("sqlgate-exit-query");
    seed_db(&temp.join("shop.sqlite"));

    let output = sqlgate(&temp)
        .args([
            "query",
            "SELECT id, name FROM users ORDER BY id",
            "--database",
            "shop.sqlite",
            "--row-cap",
            "2",
        ])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = read_envelope(&output);
    assert_eq!(envelope.pointer("/data/row_count"), Some(&json!(2)));
    assert_eq!(envelope.pointer("/data/rows/0/name"), Some(&json!("ada")));
    assert_eq!(envelope.pointer("/meta/truncated"), Some(&json!(true)));
    assert_eq!(
        envelope.pointer("/warnings/0/code"),
        Some(&json!("result_truncated"))
    );
}

#[test]
fn query_against_unknown_table_is_rejected_before_execution() {
    let temp = unique_temp_dir("sqlgate-exit-query-ghost");
    seed_db(&temp.join("shop.sqlite"));

    let output = sqlgate(&temp)
        .args(["query", "SELECT * FROM ghost", "--database", "shop.sqlite"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_VALIDATION_FAILURE));
    assert_eq!(
        read_envelope(&output).pointer("/error/details/schema_validation/invalidTables/0"),
        Some(&json!("ghost"))
    );
}

#[test]
fn query_against_missing_database_exits_with_runtime_code() {
    let temp = unique_temp_dir("sqlgate-exit-query-missing");

    let output = sqlgate(&temp)
        .args(["query", "SELECT 1", "--database", "absent.sqlite"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_RUNTIME_FAILURE));
    assert_eq!(
        read_envelope(&output).pointer("/error/code"),
        Some(&json!("query_database_unavailable"))
    );
}

#[test]
fn result_validation_exit_codes_follow_the_verdict() {
    let temp = unique_temp_dir("sqlgate-exit-result");
    std::fs::write(
        temp.join("good.json"),
        json!({ "columns": ["name", "value"], "rows": [{ "name": "A", "value": 1 }] }).to_string(),
    )
    .expect("result file should be writable");
    std::fs::write(
        temp.join("empty.json"),
        json!({ "columns": ["name"], "rows": [] }).to_string(),
    )
    .expect("result file should be writable");

    let output = sqlgate(&temp)
        .args(["result", "good.json"])
        .output()
        .expect("command should execute");
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    assert_eq!(read_envelope(&output).pointer("/data/isValid"), Some(&json!(true)));

    let output = sqlgate(&temp)
        .args(["result", "empty.json"])
        .output()
        .expect("command should execute");
    assert_eq!(output.status.code(), Some(EXIT_VALIDATION_FAILURE));
    assert_eq!(
        read_envelope(&output).pointer("/error/code"),
        Some(&json!("result_invalid"))
    );

    let output = sqlgate(&temp)
        .args(["result", "good.json", "--clean"])
        .output()
        .expect("command should execute");
    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    assert_eq!(
        read_envelope(&output).pointer("/data/cleanedData/0/name"),
        Some(&json!("A"))
    );
}

#[test]
fn schema_contract_prints_json_schema() {
    let temp = unique_temp_dir("sqlgate-exit-contract");
    let output = sqlgate(&temp)
        .args(["schema", "--contract"])
        .output()
        .expect("command should execute");

    assert_eq!(output.status.code(), Some(EXIT_SUCCESS));
    let envelope = read_envelope(&output);
    assert_eq!(envelope.pointer("/meta/kind"), Some(&json!("contract")));
    assert_eq!(envelope.pointer("/data/type"), Some(&json!("array")));
}

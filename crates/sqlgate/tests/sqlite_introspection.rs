use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::Connection;
use rusqlite::types::Value as SqlValue;
use sqlgate::SqlValidator;
use sqlgate::introspect::{
    execute_read_only_query, load_database_schema, load_schema_file, open_read_only,
};
use sqlgate::models::Cell;

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    let path = std::env::temp_dir().join(format!("{prefix}-{nanos}"));
    std::fs::create_dir_all(&path).expect("temp dir should be creatable");
    path
}

fn seed_shop_db(path: &Path) {
    let connection = Connection::open(path).expect("sqlite db should open");
    connection
        .execute_batch(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT);
             CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER NOT NULL, amount REAL);
             CREATE VIEW big_spenders AS
                 SELECT user_id, SUM(amount) AS total FROM orders GROUP BY user_id;
             INSERT INTO users (id, name, email) VALUES
                 (1, 'ada', 'ada@example.com'),
                 (2, 'linus', NULL),
                 (3, 'grace', 'grace@example.com');
             INSERT INTO orders (id, user_id, amount) VALUES
                 (10, 1, 12.5),
                 (11, 1, 30.0),
                 (12, 3, 7.25);",
        )
        .expect("fixture schema should apply");
}

#[test]
fn snapshot_lists_tables_and_views_with_columns() {
    let temp = unique_temp_dir("sqlgate-introspect-snapshot");
    let db_path = temp.join("shop.sqlite");
    seed_shop_db(&db_path);

    let connection = open_read_only(&db_path).expect("db should open read-only");
    let tables = load_database_schema(&connection).expect("schema should load");

    let names = tables
        .iter()
        .map(|table| table.table_name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["big_spenders", "orders", "users"]);

    let users = &tables[2];
    let columns = users
        .columns
        .iter()
        .map(|column| column.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(columns, vec!["id", "name", "email"]);
    let name = users.column("NAME").expect("name column should exist");
    assert_eq!(name.data_type, "TEXT");
    assert!(!name.nullable);
    assert!(users.column("email").expect("email column").nullable);

    let result = SqlValidator::validate_schema(
        "SELECT u.name, b.total FROM users u JOIN big_spenders b ON b.user_id = u.id",
        &tables,
    );
    assert!(result.valid, "unexpected errors: {:?}", result.errors);
}

#[test]
fn missing_database_is_an_error() {
    let temp = unique_temp_dir("sqlgate-introspect-missing");
    let err = open_read_only(&temp.join("absent.sqlite")).expect_err("missing db must fail");
    assert!(err.to_string().contains("does not exist"), "unexpected error: {err}");
}

#[test]
fn query_rows_are_capped_and_flagged() {
    let temp = unique_temp_dir("sqlgate-introspect-cap");
    let db_path = temp.join("shop.sqlite");
    seed_shop_db(&db_path);
    let connection = open_read_only(&db_path).expect("db should open read-only");

    let result = execute_read_only_query(
        &connection,
        "SELECT id, name, email FROM users ORDER BY id",
        &[],
        2,
    )
    .expect("query should run");

    assert_eq!(result.columns, vec!["id", "name", "email"]);
    assert_eq!(result.row_count, 2);
    assert!(result.truncated);
    assert_eq!(result.rows[0]["name"], Cell::Text("ada".to_string()));
    assert_eq!(result.rows[1]["email"], Cell::Null);

    let full = execute_read_only_query(
        &connection,
        "SELECT id FROM users ORDER BY id",
        &[],
        3,
    )
    .expect("query should run");
    assert_eq!(full.row_count, 3);
    assert!(!full.truncated);
}

#[test]
fn bound_params_reach_the_statement() {
    let temp = unique_temp_dir("sqlgate-introspect-params");
    let db_path = temp.join("shop.sqlite");
    seed_shop_db(&db_path);
    let connection = open_read_only(&db_path).expect("db should open read-only");

    let result = execute_read_only_query(
        &connection,
        "SELECT SUM(amount) AS total FROM orders WHERE user_id = ?",
        &[SqlValue::Integer(1)],
        10,
    )
    .expect("query should run");
    assert_eq!(result.rows[0]["total"], Cell::Real(42.5));
}

#[test]
fn writes_are_refused_even_past_the_screen() {
    let temp = unique_temp_dir("sqlgate-introspect-readonly");
    let db_path = temp.join("shop.sqlite");
    seed_shop_db(&db_path);
    let connection = open_read_only(&db_path).expect("db should open read-only");

    let err = execute_read_only_query(&connection, "DELETE FROM users", &[], 10)
        .expect_err("delete must be refused");
    assert!(
        format!("{err:#}").contains("not read-only"),
        "unexpected error: {err:#}"
    );
}

#[test]
fn schema_files_load_and_reject_duplicate_tables() {
    let temp = unique_temp_dir("sqlgate-introspect-schema-file");
    let good = temp.join("schema.json");
    std::fs::write(
        &good,
        r#"[{"tableName":"users","columns":[{"name":"id","type":"INTEGER","nullable":false}]}]"#,
    )
    .expect("schema file should be writable");
    let tables = load_schema_file(&good).expect("schema file should load");
    assert_eq!(tables.len(), 1);
    assert!(tables[0].has_column("ID"));

    let duplicate = temp.join("duplicate.json");
    std::fs::write(
        &duplicate,
        r#"[{"tableName":"users","columns":[]},{"tableName":"USERS","columns":[]}]"#,
    )
    .expect("schema file should be writable");
    let err = load_schema_file(&duplicate).expect_err("duplicate tables must fail");
    assert!(err.to_string().contains("more than once"), "unexpected error: {err}");
}

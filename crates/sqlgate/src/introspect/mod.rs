//! SQLite access: schema snapshots for the cross-check and guarded execution.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Error, Result, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use serde_json::Value;

use crate::models::result::{Cell, QueryResult, Row};
use crate::models::schema::{ColumnSchema, DatabaseSchema, fold_name};

/// Opens an existing database file without write access.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("sqlite database does not exist: {}", path.display());
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open sqlite database read-only: {}", path.display()))
}

/// Tables and views of `connection`, ordered by name, without SQLite internals.
pub fn load_database_schema(connection: &Connection) -> Result<Vec<DatabaseSchema>> {
    let mut statement = connection
        .prepare(
            "SELECT name
             FROM sqlite_schema
             WHERE type IN ('table', 'view')
             ORDER BY name ASC",
        )
        .context("failed to prepare sqlite_schema introspection query")?;

    let names = statement
        .query_map([], |row| row.get::<usize, String>(0))
        .context("failed to execute sqlite_schema introspection query")?;

    let mut tables = Vec::new();
    for name in names {
        let name = name.context("failed to decode sqlite_schema row")?;
        if is_internal_schema_object(&name) {
            continue;
        }
        let columns = load_schema_columns(connection, &name)?;
        tables.push(DatabaseSchema::new(name, columns));
    }

    tracing::debug!(tables = tables.len(), "loaded sqlite schema snapshot");
    Ok(tables)
}

fn load_schema_columns(connection: &Connection, object_name: &str) -> Result<Vec<ColumnSchema>> {
    let pragma_sql = format!("PRAGMA table_info({})", sqlite_single_quoted(object_name));
    let mut statement = connection
        .prepare(&pragma_sql)
        .with_context(|| format!("failed to prepare column introspection for `{object_name}`"))?;

    let column_rows = statement
        .query_map([], |row| {
            Ok(ColumnSchema::new(
                row.get::<usize, String>(1)?,
                row.get::<usize, Option<String>>(2)?.unwrap_or_default(),
                row.get::<usize, i64>(3)? == 0,
            ))
        })
        .with_context(|| format!("failed to execute column introspection for `{object_name}`"))?;

    column_rows
        .map(|row| row.context("failed to decode schema column row"))
        .collect()
}

fn is_internal_schema_object(object_name: &str) -> bool {
    object_name.starts_with("sqlite_")
}

fn sqlite_single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Reads a `DatabaseSchema[]` JSON document. Table names must be unique
/// ignoring case.
pub fn load_schema_file(path: &Path) -> Result<Vec<DatabaseSchema>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema file: {}", path.display()))?;
    let tables: Vec<DatabaseSchema> = serde_json::from_str(&raw)
        .with_context(|| format!("schema file is not a DatabaseSchema[] document: {}", path.display()))?;

    let mut seen = HashSet::new();
    for table in &tables {
        if !seen.insert(fold_name(&table.table_name)) {
            bail!(
                "schema file lists table `{}` more than once: {}",
                table.table_name,
                path.display()
            );
        }
    }

    Ok(tables)
}

/// Runs one statement that SQLite itself reports as read-only, stopping after
/// `row_cap` rows.
pub fn execute_read_only_query(
    connection: &Connection,
    sql: &str,
    params: &[SqlValue],
    row_cap: usize,
) -> Result<QueryResult> {
    let mut statement = connection
        .prepare(sql)
        .map_err(|error| Error::new(error).context("failed to prepare query"))?;
    if !statement.readonly() {
        bail!("sqlite reports the statement as not read-only");
    }

    let columns = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement
        .query(params_from_iter(params.iter()))
        .map_err(|error| Error::new(error).context("failed to execute query"))?;
    let mut result_rows = Vec::new();
    let mut truncated = false;
    while let Some(row) = rows
        .next()
        .map_err(|error| Error::new(error).context("failed to fetch query row"))?
    {
        if result_rows.len() >= row_cap {
            truncated = true;
            break;
        }

        let mut record = Row::new();
        for (index, column_name) in columns.iter().enumerate() {
            let value = row
                .get::<usize, SqlValue>(index)
                .map_err(|error| Error::new(error).context("failed to decode query column"))?;
            record.insert(column_name.clone(), cell_from_sql(value));
        }
        result_rows.push(record);
    }

    Ok(QueryResult {
        columns,
        row_count: result_rows.len(),
        rows: result_rows,
        truncated,
    })
}

/// Accepts a JSON array of scalars, a single scalar, or nothing.
pub fn parse_query_params(params_json: Option<&str>) -> Result<Vec<SqlValue>> {
    let Some(raw) = params_json else {
        return Ok(Vec::new());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parsed =
        serde_json::from_str::<Value>(trimmed).context("params must be valid JSON if provided")?;
    match parsed {
        Value::Null => Ok(Vec::new()),
        Value::Array(values) => values
            .into_iter()
            .map(sql_value_from_json)
            .collect::<Result<Vec<_>>>(),
        value => Ok(vec![sql_value_from_json(value)?]),
    }
}

fn sql_value_from_json(value: Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                bail!("unsupported numeric param value: {number}")
            }
        }
        Value::String(text) => Ok(SqlValue::Text(text)),
        Value::Array(_) | Value::Object(_) => bail!("params entries must be scalar JSON values"),
    }
}

fn cell_from_sql(value: SqlValue) -> Cell {
    match value {
        SqlValue::Null => Cell::Null,
        SqlValue::Integer(value) => Cell::Integer(value),
        SqlValue::Real(value) => Cell::Real(value),
        SqlValue::Text(value) => Cell::Text(value),
        SqlValue::Blob(value) => Cell::Text(encode_blob_hex(&value)),
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(char::from(HEX[usize::from(byte >> 4)]));
        output.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    output
}

#[cfg(test)]
mod tests {
    use rusqlite::types::Value as SqlValue;

    use super::{encode_blob_hex, parse_query_params, sqlite_single_quoted};

    #[test]
    fn params_accept_arrays_scalars_and_nothing() {
        assert!(parse_query_params(None).expect("no params").is_empty());
        assert!(parse_query_params(Some("  ")).expect("blank params").is_empty());
        assert_eq!(
            parse_query_params(Some("[1, \"a\", true, null, 2.5]")).expect("array params"),
            vec![
                SqlValue::Integer(1),
                SqlValue::Text("a".to_string()),
                SqlValue::Integer(1),
                SqlValue::Null,
                SqlValue::Real(2.5),
            ]
        );
        assert_eq!(
            parse_query_params(Some("7")).expect("scalar param"),
            vec![SqlValue::Integer(7)]
        );
    }

    #[test]
    fn params_reject_nested_values() {
        let err = parse_query_params(Some("[[1]]")).expect_err("nested params must fail");
        assert!(err.to_string().contains("scalar"), "unexpected error: {err}");
    }

    #[test]
    fn quotes_object_names_for_pragmas() {
        assert_eq!(sqlite_single_quoted("it's"), "'it''s'");
    }

    #[test]
    fn blobs_render_as_lowercase_hex() {
        assert_eq!(encode_blob_hex(&[0x00, 0xab, 0x7f]), "00ab7f");
    }
}

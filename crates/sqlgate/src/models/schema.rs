use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One table (or view) of the active data source as seen by the validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSchema {
    pub name: String,

    #[serde(rename = "type")]
    pub data_type: String,

    pub nullable: bool,
}

impl DatabaseSchema {
    #[must_use]
    pub fn new(table_name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            table_name: table_name.into(),
            columns,
        }
    }

    /// Case-insensitive column lookup.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns
            .iter()
            .find(|column| names_match(&column.name, name))
    }

    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }
}

impl ColumnSchema {
    #[must_use]
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable,
        }
    }
}

/// Case-folded form of a table, column or alias name. Identifiers may be
/// non-ASCII, so folding is per character and Unicode-aware.
#[must_use]
pub fn fold_name(name: &str) -> String {
    name.chars().flat_map(char::to_lowercase).collect()
}

/// Compares two names under [`fold_name`] without allocating.
#[must_use]
pub fn names_match(left: &str, right: &str) -> bool {
    left.chars()
        .flat_map(char::to_lowercase)
        .eq(right.chars().flat_map(char::to_lowercase))
}

/// JSON Schema of the `DatabaseSchema[]` document accepted by `--schema`.
pub fn json_schema() -> Result<Value> {
    let schema = schemars::schema_for!(Vec<DatabaseSchema>);
    serde_json::to_value(schema).context("failed to serialize generated database schema contract")
}

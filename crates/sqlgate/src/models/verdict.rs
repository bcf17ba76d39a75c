use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Outcome of the lexical safety screen. `error` is set iff `valid` is false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationResult {
    pub valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    #[must_use]
    pub const fn passed() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    #[must_use]
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct InvalidColumn {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    pub column: String,
}

/// Outcome of the schema cross-check. Every entry in `errors` is explained by
/// an entry in `invalid_tables` or `invalid_columns`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "camelCase")]
pub struct SchemaValidationResult {
    pub valid: bool,
    pub errors: Vec<String>,
    pub invalid_tables: Vec<String>,
    pub invalid_columns: Vec<InvalidColumn>,
}

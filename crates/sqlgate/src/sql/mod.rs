//! Read-only SQL gate: a lexical safety screen plus a schema cross-check.

pub mod extract;
pub mod lexer;
pub mod resolve;
pub mod safety;
pub mod syntax;

pub use resolve::SchemaIssue;
pub use safety::{SafetyViolation, StatementKind};

use crate::models::schema::DatabaseSchema;
use crate::models::verdict::{SchemaValidationResult, ValidationResult};

/// Entry points used by every query path before SQL reaches a database.
/// Both calls are pure and never touch the schema they are given.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlValidator;

impl SqlValidator {
    /// Accepts exactly one read-only statement.
    #[must_use]
    pub fn validate(sql: &str) -> ValidationResult {
        match Self::screen(sql) {
            Ok(kind) => {
                tracing::debug!(statement_kind = kind.key(), "sql passed safety screen");
                ValidationResult::passed()
            }
            Err(violation) => {
                tracing::debug!(code = violation.code(), %violation, "sql rejected by safety screen");
                ValidationResult::rejected(violation.to_string())
            }
        }
    }

    /// Typed form of [`SqlValidator::validate`].
    pub fn screen(sql: &str) -> Result<StatementKind, SafetyViolation> {
        safety::screen(sql)
    }

    /// Checks referenced tables and columns against `schema`.
    #[must_use]
    pub fn validate_schema(sql: &str, schema: &[DatabaseSchema]) -> SchemaValidationResult {
        let issues = Self::schema_issues(sql, schema);
        for issue in &issues {
            tracing::debug!(code = issue.code(), %issue, "schema cross-check issue");
        }
        resolve::summarize(&issues)
    }

    /// Typed form of [`SqlValidator::validate_schema`].
    #[must_use]
    pub fn schema_issues(sql: &str, schema: &[DatabaseSchema]) -> Vec<SchemaIssue> {
        let references = extract::extract_references(sql);
        resolve::cross_reference(&references, schema)
    }
}

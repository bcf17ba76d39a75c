use std::collections::{HashMap, HashSet};

use thiserror::Error;

use super::extract::{ColumnRef, Projection, QueryReferences, Source, SourceKind};
use crate::models::schema::{DatabaseSchema, fold_name, names_match};
use crate::models::verdict::{InvalidColumn, SchemaValidationResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaIssue {
    #[error("table `{table}` does not exist in the database schema")]
    UnknownTable { table: String },

    #[error("table or alias `{qualifier}` is not defined in the query")]
    UndefinedQualifier { qualifier: String },

    #[error("column `{column}` does not exist in table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("column `{column}` does not exist in any referenced table")]
    UnknownBareColumn { column: String },
}

impl SchemaIssue {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::UnknownTable { .. } => "unknown_table",
            Self::UndefinedQualifier { .. } => "undefined_table_alias",
            Self::UnknownColumn { .. } | Self::UnknownBareColumn { .. } => "unknown_column",
        }
    }

    fn dedupe_key(&self) -> (&'static str, String) {
        let subject = match self {
            Self::UnknownTable { table } => fold_name(table),
            Self::UndefinedQualifier { qualifier } => fold_name(qualifier),
            Self::UnknownColumn { table, column } => {
                format!("{}.{}", fold_name(table), fold_name(column))
            }
            Self::UnknownBareColumn { column } => fold_name(column),
        };
        (self.code(), subject)
    }
}

/// What a qualifier or FROM entry resolves to.
enum Binding<'a> {
    Table(&'a DatabaseSchema),
    MissingTable,
    Derived(&'a Projection),
}

struct Catalog<'a> {
    tables: HashMap<String, &'a DatabaseSchema>,
}

impl<'a> Catalog<'a> {
    fn new(schema: &'a [DatabaseSchema]) -> Self {
        let mut tables = HashMap::with_capacity(schema.len());
        for table in schema {
            tables.entry(fold_name(&table.table_name)).or_insert(table);
        }
        Self { tables }
    }

    fn table(&self, name: &str) -> Option<&'a DatabaseSchema> {
        self.tables.get(&fold_name(name)).copied()
    }

    fn bind(&self, source: &'a Source) -> Binding<'a> {
        match &source.kind {
            SourceKind::Derived(projection) => Binding::Derived(projection),
            SourceKind::Table => source
                .name
                .as_deref()
                .and_then(|name| self.table(name))
                .map_or(Binding::MissingTable, Binding::Table),
        }
    }
}

/// Checks every table and column reference against `schema`. Issues come
/// back in discovery order, tables first, without duplicates.
#[must_use]
pub fn cross_reference(references: &QueryReferences, schema: &[DatabaseSchema]) -> Vec<SchemaIssue> {
    let catalog = Catalog::new(schema);
    let mut issues = Vec::new();

    for source in references.scopes.iter().flat_map(|scope| &scope.sources) {
        if let (SourceKind::Table, Some(table)) = (&source.kind, &source.name) {
            if catalog.table(table).is_none() {
                issues.push(SchemaIssue::UnknownTable {
                    table: table.clone(),
                });
            }
        }
    }

    for (index, scope) in references.scopes.iter().enumerate() {
        for column in &scope.columns {
            if let Some(issue) = check_column(references, &catalog, index, column) {
                issues.push(issue);
            }
        }
    }

    let mut seen = HashSet::new();
    issues.retain(|issue| seen.insert(issue.dedupe_key()));
    issues
}

fn check_column<'a>(
    references: &'a QueryReferences,
    catalog: &Catalog<'a>,
    scope: usize,
    column: &ColumnRef,
) -> Option<SchemaIssue> {
    let Some(qualifier) = &column.qualifier else {
        return check_bare_column(references, catalog, scope, &column.name);
    };

    let Some(binding) = resolve_qualifier(references, catalog, scope, qualifier) else {
        return Some(SchemaIssue::UndefinedQualifier {
            qualifier: qualifier.clone(),
        });
    };
    if column.name == "*" {
        return None;
    }

    let known = match binding {
        // Already reported as an unknown table.
        Binding::MissingTable | Binding::Derived(Projection::Open) => return None,
        Binding::Table(table) => {
            return (!table.has_column(&column.name)).then(|| SchemaIssue::UnknownColumn {
                table: table.table_name.clone(),
                column: column.name.clone(),
            });
        }
        Binding::Derived(Projection::Columns(names)) => names
            .iter()
            .any(|name| names_match(name, &column.name)),
    };
    (!known).then(|| SchemaIssue::UnknownColumn {
        table: qualifier.clone(),
        column: column.name.clone(),
    })
}

/// Bare names resolve against every source visible from the scope. Any source
/// whose columns cannot be listed makes the name unverifiable.
fn check_bare_column<'a>(
    references: &'a QueryReferences,
    catalog: &Catalog<'a>,
    scope: usize,
    name: &str,
) -> Option<SchemaIssue> {
    let mut found = false;
    for source in references.chain(scope).flat_map(|scope| &scope.sources) {
        match catalog.bind(source) {
            Binding::Table(table) => found |= table.has_column(name),
            Binding::Derived(Projection::Columns(names)) => {
                found |= names.iter().any(|column| names_match(column, name));
            }
            Binding::MissingTable | Binding::Derived(Projection::Open) => return None,
        }
    }
    (!found).then(|| SchemaIssue::UnknownBareColumn {
        column: name.to_string(),
    })
}

/// Innermost scope wins; within a scope an alias beats a table name.
fn resolve_qualifier<'s>(
    references: &'s QueryReferences,
    catalog: &Catalog<'s>,
    scope: usize,
    qualifier: &str,
) -> Option<Binding<'s>> {
    let matches = |candidate: &Option<String>| {
        candidate
            .as_deref()
            .is_some_and(|text| names_match(text, qualifier))
    };
    references.chain(scope).find_map(|scope| {
        scope
            .sources
            .iter()
            .find(|source| matches(&source.alias))
            .or_else(|| scope.sources.iter().find(|source| matches(&source.name)))
            .map(|source| catalog.bind(source))
    })
}

/// Folds issues into the caller-facing verdict.
#[must_use]
pub fn summarize(issues: &[SchemaIssue]) -> SchemaValidationResult {
    let mut result = SchemaValidationResult {
        valid: issues.is_empty(),
        ..SchemaValidationResult::default()
    };
    for issue in issues {
        result.errors.push(issue.to_string());
        match issue {
            SchemaIssue::UnknownTable { table } => result.invalid_tables.push(table.clone()),
            SchemaIssue::UndefinedQualifier { qualifier } => {
                result.invalid_tables.push(qualifier.clone());
            }
            SchemaIssue::UnknownColumn { table, column } => {
                result.invalid_columns.push(InvalidColumn {
                    table: Some(table.clone()),
                    column: column.clone(),
                });
            }
            SchemaIssue::UnknownBareColumn { column } => {
                result.invalid_columns.push(InvalidColumn {
                    table: None,
                    column: column.clone(),
                });
            }
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::{SchemaIssue, cross_reference, summarize};
    use crate::models::schema::{ColumnSchema, DatabaseSchema};
    use crate::sql::extract::extract_references;

    fn users() -> Vec<DatabaseSchema> {
        vec![DatabaseSchema::new(
            "users",
            vec![
                ColumnSchema::new("id", "int", false),
                ColumnSchema::new("name", "varchar", true),
            ],
        )]
    }

    fn issues(sql: &str) -> Vec<SchemaIssue> {
        cross_reference(&extract_references(sql), &users())
    }

    #[test]
    fn repeated_problems_are_reported_once() {
        assert_eq!(
            issues("SELECT nope FROM users WHERE NOPE > 1 ORDER BY nope"),
            vec![SchemaIssue::UnknownBareColumn {
                column: "nope".to_string()
            }]
        );
    }

    #[test]
    fn columns_of_missing_tables_are_not_reported_twice() {
        assert_eq!(
            issues("SELECT g.anything, whatever FROM ghost g"),
            vec![SchemaIssue::UnknownTable {
                table: "ghost".to_string()
            }]
        );
    }

    #[test]
    fn summary_keeps_errors_and_details_aligned() {
        let result = summarize(&issues("SELECT x.id, u.email FROM users u"));
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 2);
        assert_eq!(result.invalid_tables, vec!["x".to_string()]);
        assert_eq!(result.invalid_columns.len(), 1);
        assert_eq!(result.invalid_columns[0].table.as_deref(), Some("users"));
    }
}

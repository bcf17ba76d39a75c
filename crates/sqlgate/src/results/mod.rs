//! Sanity checks on query results before they are charted or reported.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::models::result::{Cell, ChartDataValidation, ResultValidation, Row};

pub const LARGE_RESULT_ROWS: usize = 1_000;
pub const HIGH_NULL_RATIO: f64 = 0.5;

/// Largest integer a JSON consumer can represent exactly.
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartCleanOptions {
    pub remove_null_rows: bool,
    /// Rows whose NULL share is strictly greater than this are removed.
    pub null_threshold: f64,
    pub max_rows: usize,
}

impl Default for ChartCleanOptions {
    fn default() -> Self {
        Self {
            remove_null_rows: true,
            null_threshold: HIGH_NULL_RATIO,
            max_rows: LARGE_RESULT_ROWS,
        }
    }
}

/// Checks a `{ columns, rows }` document as returned by a query.
#[must_use]
pub fn validate_query_result(result: &Value) -> ResultValidation {
    let mut validation = ResultValidation::default();

    if result.is_null() {
        validation.is_empty = true;
        validation.errors.push("query result is empty".to_string());
        return validation;
    }

    let Some(rows) = result.get("rows").and_then(Value::as_array) else {
        validation
            .errors
            .push("query result rows is not an array".to_string());
        return validation;
    };

    if rows.is_empty() {
        validation.is_empty = true;
        validation.errors.push("query returned no data".to_string());
        return validation;
    }

    let columns = result
        .get("columns")
        .and_then(Value::as_array)
        .map(|columns| columns.iter().filter_map(Value::as_str).collect::<Vec<_>>())
        .unwrap_or_default();
    if columns.is_empty() {
        validation
            .errors
            .push("query result is missing column information".to_string());
        return validation;
    }

    if rows.len() > LARGE_RESULT_ROWS {
        validation.warnings.push(format!(
            "large result set: {} rows; consider adding a LIMIT or aggregating",
            rows.len()
        ));
    }

    let total_cells = rows.len() * columns.len();
    let null_cells = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .filter(|column| row.get(**column).is_none_or(Value::is_null))
                .count()
        })
        .sum::<usize>();
    let null_ratio = ratio(null_cells, total_cells);
    if null_ratio > HIGH_NULL_RATIO {
        validation.warnings.push(format!(
            "high NULL ratio: {:.1}% of values are NULL",
            null_ratio * 100.0
        ));
    }

    validation.is_valid = true;
    validation
}

/// Parses `data` as an array of flat row objects and cleans it for charting.
#[must_use]
pub fn clean_chart_data(data: &Value, options: &ChartCleanOptions) -> ChartDataValidation {
    let Some(items) = data.as_array() else {
        return rejected("chart data is not an array");
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        match serde_json::from_value::<Row>(item.clone()) {
            Ok(row) => rows.push(row),
            Err(error) => {
                return rejected(format!("chart row {index} is not a flat object: {error}"));
            }
        }
    }

    clean_chart_rows(rows, options)
}

/// Removes mostly-NULL rows, replaces non-finite numbers and samples the
/// rows down to `max_rows`.
#[must_use]
pub fn clean_chart_rows(rows: Vec<Row>, options: &ChartCleanOptions) -> ChartDataValidation {
    if rows.is_empty() {
        return rejected("chart data is empty");
    }

    let mut validation = ChartDataValidation::default();
    let original_rows = rows.len();

    let mut rows = if options.remove_null_rows {
        rows.into_iter()
            .filter(|row| row_null_ratio(row) <= options.null_threshold)
            .collect::<Vec<_>>()
    } else {
        rows
    };
    let removed = original_rows - rows.len();
    if removed > 0 {
        validation.warnings.push(format!(
            "removed {removed} row(s) with more than {:.0}% NULL values",
            options.null_threshold * 100.0
        ));
    }
    if rows.is_empty() {
        validation
            .errors
            .push("no chart rows remain after removing NULL-heavy rows".to_string());
        return validation;
    }

    let replaced = rows
        .iter_mut()
        .flat_map(|row| row.values_mut())
        .map(replace_non_finite)
        .filter(|changed| *changed)
        .count();
    if replaced > 0 {
        validation.warnings.push(format!(
            "replaced {replaced} non-finite numeric value(s)"
        ));
    }

    if options.max_rows > 0 && rows.len() > options.max_rows {
        let before = rows.len();
        rows = sample_evenly(rows, options.max_rows);
        validation.warnings.push(format!(
            "sampled {before} rows down to {} for charting",
            rows.len()
        ));
    }

    let columns = rows
        .iter()
        .flat_map(|row| row.keys())
        .collect::<BTreeSet<_>>();
    if columns.len() < 2 {
        validation.warnings.push(
            "fewer than 2 columns; charts need a category and a value column".to_string(),
        );
    }

    tracing::debug!(
        input_rows = original_rows,
        output_rows = rows.len(),
        removed,
        replaced,
        "cleaned chart data"
    );

    validation.is_valid = true;
    validation.cleaned_data = rows;
    validation
}

fn rejected(error: impl Into<String>) -> ChartDataValidation {
    ChartDataValidation {
        errors: vec![error.into()],
        ..ChartDataValidation::default()
    }
}

fn row_null_ratio(row: &Row) -> f64 {
    ratio(row.values().filter(|cell| cell.is_null()).count(), row.len())
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let value = part as f64 / whole as f64;
    value
}

/// NaN becomes 0 and infinities clamp to the largest safe integer.
fn replace_non_finite(cell: &mut Cell) -> bool {
    let Cell::Real(value) = *cell else {
        return false;
    };
    if value.is_nan() {
        *cell = Cell::Integer(0);
    } else if value.is_infinite() {
        *cell = Cell::Integer(if value > 0.0 {
            MAX_SAFE_INTEGER
        } else {
            -MAX_SAFE_INTEGER
        });
    } else {
        return false;
    }
    true
}

/// Keeps `target` rows at evenly spaced positions, first row included.
fn sample_evenly(rows: Vec<Row>, target: usize) -> Vec<Row> {
    let total = rows.len();
    let mut next_pick = 0usize;
    let mut picked = 0usize;
    rows.into_iter()
        .enumerate()
        .filter_map(|(index, row)| {
            if picked < target && index == next_pick {
                picked += 1;
                next_pick = picked * total / target;
                Some(row)
            } else {
                None
            }
        })
        .collect()
}

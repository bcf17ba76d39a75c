use serde_json::{Value, json};
use sqlgate::models::{Cell, Row};
use sqlgate::results::{
    ChartCleanOptions, clean_chart_data, clean_chart_rows, validate_query_result,
};

fn keep_nulls() -> ChartCleanOptions {
    ChartCleanOptions {
        remove_null_rows: false,
        ..ChartCleanOptions::default()
    }
}

fn series(count: usize) -> Value {
    Value::Array(
        (0..count)
            .map(|index| json!({ "label": format!("p{index}"), "value": index }))
            .collect(),
    )
}

#[test]
fn valid_chart_rows_pass_untouched() {
    let data = json!([
        { "name": "A", "value": 10 },
        { "name": "B", "value": 20 },
        { "name": "C", "value": 30 }
    ]);

    let result = clean_chart_data(&data, &ChartCleanOptions::default());
    assert!(result.is_valid);
    assert_eq!(result.cleaned_data.len(), 3);
    assert!(result.errors.is_empty());
    assert!(result.warnings.is_empty());
    assert_eq!(result.cleaned_data[1]["value"], Cell::Integer(20));
}

#[test]
fn non_array_and_empty_chart_data_are_rejected() {
    let result = clean_chart_data(&Value::Null, &ChartCleanOptions::default());
    assert!(!result.is_valid);
    assert_eq!(result.errors, vec!["chart data is not an array".to_string()]);

    let result = clean_chart_data(&json!([]), &ChartCleanOptions::default());
    assert!(!result.is_valid);
    assert_eq!(result.errors, vec!["chart data is empty".to_string()]);

    let result = clean_chart_data(&json!([{ "nested": { "a": 1 } }]), &ChartCleanOptions::default());
    assert!(!result.is_valid);
    assert!(result.errors[0].starts_with("chart row 0 is not a flat object"));
}

#[test]
fn null_cells_are_kept_when_row_removal_is_off() {
    let data = json!([
        { "name": "A", "value": 10 },
        { "name": "B", "value": null },
        { "name": null, "value": null }
    ]);

    let result = clean_chart_data(&data, &keep_nulls());
    assert!(result.is_valid);
    assert_eq!(result.cleaned_data.len(), 3);
    assert_eq!(result.cleaned_data[1]["value"], Cell::Null);
}

#[test]
fn mostly_null_rows_are_removed_past_the_threshold() {
    let data = json!([
        { "name": "A", "value": 10 },
        { "name": "B", "value": null },
        { "name": null, "value": null }
    ]);

    let result = clean_chart_data(&data, &ChartCleanOptions::default());
    assert!(result.is_valid);
    // Exactly half NULL stays; the all-NULL row goes.
    assert_eq!(result.cleaned_data.len(), 2);
    assert_eq!(
        result.warnings,
        vec!["removed 1 row(s) with more than 50% NULL values".to_string()]
    );
}

#[test]
fn all_null_rows_leave_nothing_to_chart() {
    let data = json!([{ "name": null, "value": null }]);
    let result = clean_chart_data(&data, &ChartCleanOptions::default());
    assert!(!result.is_valid);
    assert_eq!(
        result.errors,
        vec!["no chart rows remain after removing NULL-heavy rows".to_string()]
    );
}

#[test]
fn non_finite_numbers_are_replaced() {
    let rows = vec![
        Row::from([
            ("label".to_string(), Cell::Text("nan".to_string())),
            ("value".to_string(), Cell::Real(f64::NAN)),
        ]),
        Row::from([
            ("label".to_string(), Cell::Text("up".to_string())),
            ("value".to_string(), Cell::Real(f64::INFINITY)),
        ]),
        Row::from([
            ("label".to_string(), Cell::Text("down".to_string())),
            ("value".to_string(), Cell::Real(f64::NEG_INFINITY)),
        ]),
        Row::from([
            ("label".to_string(), Cell::Text("fine".to_string())),
            ("value".to_string(), Cell::Real(1.5)),
        ]),
    ];

    let result = clean_chart_rows(rows, &ChartCleanOptions::default());
    assert!(result.is_valid);
    assert_eq!(result.cleaned_data[0]["value"], Cell::Integer(0));
    assert_eq!(result.cleaned_data[1]["value"], Cell::Integer(9_007_199_254_740_991));
    assert_eq!(result.cleaned_data[2]["value"], Cell::Integer(-9_007_199_254_740_991));
    assert_eq!(result.cleaned_data[3]["value"], Cell::Real(1.5));
    assert_eq!(
        result.warnings,
        vec!["replaced 3 non-finite numeric value(s)".to_string()]
    );
}

#[test]
fn large_series_are_sampled_to_max_rows() {
    let result = clean_chart_data(&series(2_500), &ChartCleanOptions::default());
    assert!(result.is_valid);
    assert_eq!(result.cleaned_data.len(), 1_000);
    assert_eq!(result.cleaned_data[0]["label"], Cell::Text("p0".to_string()));
    assert!(
        result
            .warnings
            .contains(&"sampled 2500 rows down to 1000 for charting".to_string())
    );

    let options = ChartCleanOptions {
        max_rows: 10,
        ..ChartCleanOptions::default()
    };
    assert_eq!(clean_chart_data(&series(100), &options).cleaned_data.len(), 10);
}

#[test]
fn single_column_data_warns_but_passes() {
    let result = clean_chart_data(&json!([{ "value": 1 }, { "value": 2 }]), &ChartCleanOptions::default());
    assert!(result.is_valid);
    assert_eq!(
        result.warnings,
        vec!["fewer than 2 columns; charts need a category and a value column".to_string()]
    );
}

#[test]
fn query_result_with_rows_is_valid() {
    let result = validate_query_result(&json!({
        "columns": ["name", "value"],
        "rows": [{ "name": "A", "value": 1 }, { "name": "B", "value": 2 }]
    }));
    assert!(result.is_valid);
    assert!(!result.is_empty);
    assert!(result.warnings.is_empty());
    assert!(result.errors.is_empty());
}

#[test]
fn empty_or_malformed_query_results_are_invalid() {
    let result = validate_query_result(&Value::Null);
    assert!(!result.is_valid);
    assert!(result.is_empty);
    assert_eq!(result.errors, vec!["query result is empty".to_string()]);

    let result = validate_query_result(&json!({ "columns": ["a"], "rows": [] }));
    assert!(!result.is_valid);
    assert!(result.is_empty);
    assert_eq!(result.errors, vec!["query returned no data".to_string()]);

    let result = validate_query_result(&json!({ "columns": ["a"], "rows": "nope" }));
    assert_eq!(result.errors, vec!["query result rows is not an array".to_string()]);

    let result = validate_query_result(&json!({ "rows": [{ "a": 1 }] }));
    assert!(!result.is_valid);
    assert_eq!(
        result.errors,
        vec!["query result is missing column information".to_string()]
    );
}

#[test]
fn quality_warnings_flag_large_and_sparse_results() {
    let rows = (0..1_001).map(|index| json!({ "a": index })).collect::<Vec<_>>();
    let result = validate_query_result(&json!({ "columns": ["a"], "rows": rows }));
    assert!(result.is_valid);
    assert_eq!(result.warnings.len(), 1);
    assert!(result.warnings[0].starts_with("large result set: 1001 rows"));

    let result = validate_query_result(&json!({
        "columns": ["a", "b"],
        "rows": [{ "a": 1, "b": null }, { "a": null, "b": null }]
    }));
    assert!(result.is_valid);
    assert_eq!(
        result.warnings,
        vec!["high NULL ratio: 75.0% of values are NULL".to_string()]
    );
}

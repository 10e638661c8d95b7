//! Row transforms applied between column validation and dedupe.
//!
//! Steps run in a fixed order: sentinel scrub, rename, keep-list projection,
//! then the dataset's coercion hook. Row count never changes.

mod coercion;

pub use coercion::{Coercion, NumericCoercion, coercion_for};

use std::sync::Arc;

use arrow::array::{Array, ArrayRef, AsArray, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;
use rayon::prelude::*;
use regex::Regex;
use tracing::debug;

use crate::config::DatasetSpec;
use crate::types::RowSet;

/// Run every transform step for `spec` over `rows`.
pub fn transform(rows: &RowSet, spec: &DatasetSpec) -> Result<RowSet, ArrowError> {
    let scrubbed = scrub_sentinels(rows, &spec.null_pattern)?;
    let renamed = rename_columns(&scrubbed, spec)?;
    let kept = match &spec.keep_columns {
        Some(keep) => keep_columns(&renamed, keep)?,
        None => renamed,
    };
    let coercion = coercion_for(spec);
    debug!(dataset = %spec.name, coercion = coercion.name(), "Applying coercion");
    coercion.apply(&kept)
}

// `pattern` comes anchored from `null_sentinel_regex`.
fn is_sentinel(pattern: &Regex, value: &str) -> bool {
    pattern.is_match(value)
}

fn scrub_array(array: &ArrayRef, pattern: &Regex) -> ArrayRef {
    match array.data_type() {
        DataType::Utf8 => {
            let strings = array.as_string::<i32>();
            let scrubbed: StringArray = strings
                .iter()
                .map(|value| value.filter(|v| !is_sentinel(pattern, v)))
                .collect();
            Arc::new(scrubbed)
        }
        _ => Arc::clone(array),
    }
}

/// Replace sentinel cells with null in every UTF-8 column. Columns are scrubbed in parallel.
///
/// `pattern` must be built with [`null_sentinel_regex`](crate::config::null_sentinel_regex) so only whole cells match.
pub fn scrub_sentinels(rows: &RowSet, pattern: &Regex) -> Result<RowSet, ArrowError> {
    let arrays: Vec<ArrayRef> = rows
        .columns()
        .par_iter()
        .map(|array| scrub_array(array, pattern))
        .collect();

    let fields: Vec<Field> = rows
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_nullable(true))
        .collect();

    RowSet::try_new(Arc::new(Schema::new(fields)), arrays)
}

/// Apply the dataset's rename map. Unmapped columns keep their names.
pub fn rename_columns(rows: &RowSet, spec: &DatasetSpec) -> Result<RowSet, ArrowError> {
    if spec.rename.is_empty() {
        return Ok(rows.clone());
    }
    let fields: Vec<Field> = rows
        .schema()
        .fields()
        .iter()
        .map(|f| f.as_ref().clone().with_name(spec.resolve(f.name())))
        .collect();

    RowSet::try_new(Arc::new(Schema::new(fields)), rows.columns().to_vec())
}

/// Project onto the keep-list columns that exist, in keep-list order.
pub fn keep_columns(rows: &RowSet, keep: &[String]) -> Result<RowSet, ArrowError> {
    let schema = rows.schema();
    let mut indices: Vec<usize> = Vec::with_capacity(keep.len());
    for name in keep {
        if let Some((index, _)) = schema.column_with_name(name) {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }
    rows.project(&indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_NULL_PATTERN, null_sentinel_regex};
    use arrow::datatypes::Float64Type;
    use std::collections::HashMap;

    fn raw_results() -> RowSet {
        let schema = Schema::new(vec![
            Field::new("resultId", DataType::Utf8, true),
            Field::new("driverId", DataType::Utf8, true),
            Field::new("position", DataType::Utf8, true),
            Field::new("points", DataType::Utf8, true),
            Field::new("time", DataType::Utf8, true),
        ]);
        RowSet::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(vec!["1", "2", "3"])),
                Arc::new(StringArray::from(vec![Some("10"), Some("\\N"), Some("12")])),
                Arc::new(StringArray::from(vec![Some("1"), Some("\\N"), Some("3")])),
                Arc::new(StringArray::from(vec![Some("25"), Some("18"), Some("x15")])),
                Arc::new(StringArray::from(vec![Some("1:34:50"), Some("\\\\N"), Some("a\\N")])),
            ],
        )
        .unwrap()
    }

    fn results_spec() -> DatasetSpec {
        let rename: HashMap<String, String> = [
            ("resultId", "result_id"),
            ("driverId", "driver_id"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        DatasetSpec::new(
            "results",
            "data/raw/results.csv",
            "data/processed/results_valid.csv",
            "data/rejected/results_rejects.csv",
            "results",
            vec![],
            vec!["resultId".into()],
        )
        .with_rename(rename)
    }

    #[test]
    fn test_scrub_whole_cell_only() {
        let pattern = null_sentinel_regex(DEFAULT_NULL_PATTERN).unwrap();
        let out = scrub_sentinels(&raw_results(), &pattern).unwrap();
        let time = out.column_by_name("time").unwrap().as_string::<i32>();
        assert_eq!(time.value(0), "1:34:50");
        // doubled backslash is still the sentinel
        assert!(time.is_null(1));
        // embedded marker is data
        assert_eq!(time.value(2), "a\\N");

        let driver = out.column_by_name("driverId").unwrap();
        assert_eq!(driver.null_count(), 1);
    }

    #[test]
    fn test_scrub_alternation_matches_longest_whole_cell() {
        let schema = Arc::new(Schema::new(vec![Field::new("status", DataType::Utf8, true)]));
        let rows = RowSet::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec![
                Some("NA"),
                Some("NAN"),
                Some("NANA"),
                Some("Finished"),
            ]))],
        )
        .unwrap();
        let pattern = null_sentinel_regex("NA|NAN").unwrap();
        let out = scrub_sentinels(&rows, &pattern).unwrap();
        let status = out.column(0).as_string::<i32>();
        assert!(status.is_null(0));
        assert!(status.is_null(1));
        assert_eq!(status.value(2), "NANA");
        assert_eq!(status.value(3), "Finished");
    }

    #[test]
    fn test_transform_full_chain() {
        let out = transform(&raw_results(), &results_spec()).unwrap();
        assert_eq!(out.num_rows(), 3);

        let schema = out.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["result_id", "driver_id", "position", "points", "time"]);

        let position = out.column_by_name("position").unwrap().as_primitive::<Float64Type>();
        assert_eq!(position.value(0), 1.0);
        assert!(position.is_null(1));

        let points = out.column_by_name("points").unwrap().as_primitive::<Float64Type>();
        assert_eq!(points.value(1), 18.0);
        assert!(points.is_null(2));
    }

    #[test]
    fn test_keep_columns_order_and_absent_ignored() {
        let spec = results_spec().with_keep_columns(vec![
            "points".into(),
            "result_id".into(),
            "grid".into(),
        ]);
        let out = transform(&raw_results(), &spec).unwrap();
        let schema = out.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["points", "result_id"]);
        assert_eq!(out.num_rows(), 3);
    }

    #[test]
    fn test_rename_only_touches_mapped_columns() {
        let out = rename_columns(&raw_results(), &results_spec()).unwrap();
        assert!(out.column_by_name("result_id").is_some());
        assert!(out.column_by_name("resultId").is_none());
        assert!(out.column_by_name("time").is_some());
    }

    #[test]
    fn test_transform_empty_rowset() {
        let empty = raw_results().slice(0, 0);
        let out = transform(&empty, &results_spec()).unwrap();
        assert_eq!(out.num_rows(), 0);
        assert_eq!(out.num_columns(), 5);
    }
}

use std::collections::HashSet;

use arrow::array::{ArrayRef, BooleanArray};
use arrow::compute::filter_record_batch;
use arrow::row::{RowConverter, SortField};

use crate::errors::{IngestError, SchemaError};
use crate::types::RowSet;
use crate::utils::hasher::Xxh3Builder;
use crate::validator::missing_columns;

/// Keep the first row of every distinct key tuple, in input order.
///
/// Key tuples compare structurally on their row encoding, so two nulls in the
/// same key column are equal.
pub fn deduplicate(rows: &RowSet, keys: &[String]) -> Result<RowSet, IngestError> {
    if keys.is_empty() {
        return Err(SchemaError::NoKeyColumns.into());
    }
    let missing = missing_columns(rows.schema_ref(), keys);
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns(missing).into());
    }

    let key_arrays: Vec<ArrayRef> = keys
        .iter()
        .filter_map(|name| rows.column_by_name(name).cloned())
        .collect();
    let fields = key_arrays
        .iter()
        .map(|array| SortField::new(array.data_type().clone()))
        .collect();

    let converter = RowConverter::new(fields)?;
    let encoded = converter.convert_columns(&key_arrays)?;

    let mut seen = HashSet::with_capacity_and_hasher(rows.num_rows(), Xxh3Builder);
    let keep: BooleanArray = encoded
        .iter()
        .map(|row| Some(seen.insert(row)))
        .collect();

    if keep.true_count() == rows.num_rows() {
        return Ok(rows.clone());
    }
    Ok(filter_record_batch(rows, &keep)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, AsArray, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use std::sync::Arc;

    fn laps(race: Vec<Option<&str>>, driver: Vec<Option<&str>>, lap: Vec<&str>) -> RowSet {
        let schema = Schema::new(vec![
            Field::new("race_id", DataType::Utf8, true),
            Field::new("driver_id", DataType::Utf8, true),
            Field::new("lap", DataType::Utf8, true),
        ]);
        RowSet::try_new(
            Arc::new(schema),
            vec![
                Arc::new(StringArray::from(race)),
                Arc::new(StringArray::from(driver)),
                Arc::new(StringArray::from(lap)),
            ],
        )
        .unwrap()
    }

    fn keys() -> Vec<String> {
        vec!["race_id".to_string(), "driver_id".to_string()]
    }

    fn lap_values(rows: &RowSet) -> Vec<String> {
        rows.column_by_name("lap")
            .unwrap()
            .as_string::<i32>()
            .iter()
            .map(|v| v.unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_first_occurrence_kept() {
        let input = laps(
            vec![Some("18"), Some("18"), Some("18"), Some("19")],
            vec![Some("1"), Some("2"), Some("1"), Some("1")],
            vec!["a", "b", "c", "d"],
        );
        let out = deduplicate(&input, &keys()).unwrap();
        assert_eq!(out.num_rows(), 3);
        assert_eq!(lap_values(&out), vec!["a", "b", "d"]);
    }

    #[test]
    fn test_null_keys_compare_equal() {
        let input = laps(
            vec![None, None, Some("18")],
            vec![Some("1"), Some("1"), Some("1")],
            vec!["a", "b", "c"],
        );
        let out = deduplicate(&input, &keys()).unwrap();
        assert_eq!(lap_values(&out), vec!["a", "c"]);
        assert_eq!(out.column_by_name("race_id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_idempotent() {
        let input = laps(
            vec![Some("1"), Some("1"), Some("2"), Some("2"), Some("1")],
            vec![Some("1"), Some("1"), Some("1"), Some("2"), Some("1")],
            vec!["a", "b", "c", "d", "e"],
        );
        let once = deduplicate(&input, &keys()).unwrap();
        let twice = deduplicate(&once, &keys()).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once.num_rows(), 3);
    }

    #[test]
    fn test_no_duplicates_is_identity() {
        let input = laps(
            vec![Some("1"), Some("2")],
            vec![Some("1"), Some("1")],
            vec!["a", "b"],
        );
        let out = deduplicate(&input, &keys()).unwrap();
        assert_eq!(out, input);
    }

    #[test]
    fn test_whitespace_is_significant() {
        let input = laps(
            vec![Some("18"), Some("18 ")],
            vec![Some("1"), Some("1")],
            vec!["a", "b"],
        );
        let out = deduplicate(&input, &keys()).unwrap();
        assert_eq!(out.num_rows(), 2);
    }

    #[test]
    fn test_empty_keys_rejected() {
        let input = laps(vec![Some("1")], vec![Some("1")], vec!["a"]);
        let err = deduplicate(&input, &[]).unwrap_err();
        assert!(matches!(err, IngestError::Schema(SchemaError::NoKeyColumns)));
    }

    #[test]
    fn test_missing_key_column() {
        let input = laps(vec![Some("1")], vec![Some("1")], vec!["a"]);
        let err = deduplicate(&input, &["constructor_id".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema(SchemaError::MissingColumns(ref m)) if m == &vec!["constructor_id".to_string()]
        ));
    }
}

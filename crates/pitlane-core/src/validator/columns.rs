use arrow::datatypes::Schema;

use crate::errors::SchemaError;

/// Columns from `required` that `schema` lacks, in request order, without repeats.
pub fn missing_columns(schema: &Schema, required: &[String]) -> Vec<String> {
    let mut missing: Vec<String> = Vec::new();
    for column in required {
        if schema.column_with_name(column).is_none() && !missing.contains(column) {
            missing.push(column.clone());
        }
    }
    missing
}

/// Check that the raw input carries every required column.
pub fn validate_required_columns(schema: &Schema, required: &[String]) -> Result<(), SchemaError> {
    let missing = missing_columns(schema, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::MissingColumns(missing))
    }
}

/// Check that dedupe keys (and other rule columns) survived the transform.
pub fn validate_key_columns(schema: &Schema, keys: &[String]) -> Result<(), SchemaError> {
    let missing = missing_columns(schema, keys);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError::KeysNotFoundAfterTransform(missing))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field};

    fn results_schema() -> Schema {
        Schema::new(
            ["resultId", "raceId", "driverId", "constructorId", "position"]
                .iter()
                .map(|n| Field::new(*n, DataType::Utf8, true))
                .collect::<Vec<_>>(),
        )
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_required_present() {
        let required = cols(&["resultId", "raceId", "driverId", "constructorId"]);
        assert!(validate_required_columns(&results_schema(), &required).is_ok());
    }

    #[test]
    fn test_missing_column_is_named() {
        let required = cols(&["resultId", "raceId", "points"]);
        let err = validate_required_columns(&results_schema(), &required).unwrap_err();
        match err {
            SchemaError::MissingColumns(missing) => assert_eq!(missing, vec!["points"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_columns_order_and_no_duplicates() {
        let required = cols(&["points", "grid", "resultId", "points"]);
        assert_eq!(
            missing_columns(&results_schema(), &required),
            vec!["points", "grid"]
        );
    }

    #[test]
    fn test_keys_not_found_after_transform() {
        // keys named in their renamed form while the schema still uses source names
        let keys = cols(&["result_id", "raceId"]);
        let err = validate_key_columns(&results_schema(), &keys).unwrap_err();
        assert!(matches!(err, SchemaError::KeysNotFoundAfterTransform(ref k) if k == &vec!["result_id".to_string()]));
    }

    #[test]
    fn test_empty_requirement_passes() {
        assert!(validate_required_columns(&results_schema(), &[]).is_ok());
    }
}

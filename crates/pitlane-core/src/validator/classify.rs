use arrow::array::{Array, BooleanArray};
use arrow::compute::filter_record_batch;

use crate::errors::{ConfigError, IngestError};
use crate::types::{RowSet, ValidationOutcome};
use crate::validator::missing_columns;

/// Split `rows` into rows with every `required_not_null` column populated and the rest.
///
/// A required column absent from the schema is a configuration error, never
/// "all null".
pub fn split_valid_rejected(
    rows: &RowSet,
    required_not_null: &[String],
) -> Result<ValidationOutcome, IngestError> {
    let missing = missing_columns(rows.schema_ref(), required_not_null);
    if !missing.is_empty() {
        return Err(ConfigError::UnknownColumns {
            role: "required-not-null",
            columns: missing,
        }
        .into());
    }

    let arrays: Vec<&dyn Array> = required_not_null
        .iter()
        .filter_map(|name| rows.column_by_name(name))
        .map(|array| array.as_ref())
        .collect();

    let rejected: Vec<bool> = (0..rows.num_rows())
        .map(|i| arrays.iter().any(|array| array.is_null(i)))
        .collect();
    let valid: Vec<bool> = rejected.iter().map(|r| !r).collect();

    Ok(ValidationOutcome {
        valid: filter_record_batch(rows, &BooleanArray::from(valid))?,
        rejected: filter_record_batch(rows, &BooleanArray::from(rejected))?,
    })
}

use std::sync::Arc;

use arrow::compute;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::error::ArrowError;

use crate::config::DatasetSpec;
use crate::types::RowSet;

/// Dataset-specific type coercion applied as the last transform step.
pub trait Coercion: Send + Sync {
    fn name(&self) -> &'static str;
    fn apply(&self, rows: &RowSet) -> Result<RowSet, ArrowError>;
}

/// Casts the listed columns to nullable `Float64`; unparseable values become null.
///
/// Columns not present in the input are skipped.
pub struct NumericCoercion {
    columns: Vec<String>,
}

impl NumericCoercion {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }
}

impl Coercion for NumericCoercion {
    fn name(&self) -> &'static str {
        "NumericCoercion"
    }

    fn apply(&self, rows: &RowSet) -> Result<RowSet, ArrowError> {
        if self.columns.is_empty() {
            return Ok(rows.clone());
        }

        let schema = rows.schema();
        let mut fields = Vec::with_capacity(schema.fields().len());
        let mut arrays = Vec::with_capacity(rows.num_columns());

        for (field, array) in schema.fields().iter().zip(rows.columns()) {
            if self.columns.iter().any(|c| c == field.name()) {
                // default cast options are "safe": failures turn into nulls
                arrays.push(compute::cast(array, &DataType::Float64)?);
                fields.push(Field::new(field.name(), DataType::Float64, true));
            } else {
                arrays.push(Arc::clone(array));
                fields.push(field.as_ref().clone());
            }
        }

        RowSet::try_new(Arc::new(Schema::new(fields)), arrays)
    }
}

/// Built-in coercion targets for datasets that do not list `numeric_columns`.
fn default_numeric_columns(dataset: &str) -> Vec<String> {
    match dataset {
        "results" => vec!["position".to_string(), "points".to_string()],
        _ => Vec::new(),
    }
}

/// Pick the coercion hook for a dataset: configured columns win over the built-in default.
pub fn coercion_for(spec: &DatasetSpec) -> Box<dyn Coercion> {
    let columns = match &spec.numeric_columns {
        Some(columns) => columns.iter().map(|c| spec.resolve(c).to_string()).collect(),
        None => default_numeric_columns(&spec.name),
    };
    Box::new(NumericCoercion::new(columns))
}

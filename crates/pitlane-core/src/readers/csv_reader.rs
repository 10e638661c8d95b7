//! CSV input.
//!
//! Every column is decoded as nullable UTF-8; typing is the transformer's job.
//! Empty cells decode as null.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use arrow::compute::concat_batches;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder as CsvReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};

use crate::errors::{IngestError, SchemaError};
use crate::readers::ReaderConfig;
use crate::types::RowSet;

/// Build an all-UTF-8 schema from the header row.
pub fn read_csv_schema(path: &Path, config: &ReaderConfig) -> Result<Schema, IngestError> {
    let file = File::open(path)?;
    let (header, _) = Format::default()
        .with_header(true)
        .with_delimiter(config.delimiter)
        .with_quote(config.quote)
        .infer_schema(file, Some(0))?;

    if header.fields().is_empty() {
        return Err(SchemaError::EmptyInput(path.display().to_string()).into());
    }

    let fields: Vec<Field> = header
        .fields()
        .iter()
        .map(|f| Field::new(f.name(), DataType::Utf8, true))
        .collect();
    Ok(Schema::new(fields))
}

/// Read a whole CSV file into a single [`RowSet`].
pub fn read_csv(path: &Path, config: &ReaderConfig) -> Result<RowSet, IngestError> {
    let schema = Arc::new(read_csv_schema(path, config)?);
    let file = File::open(path)?;

    let reader = CsvReaderBuilder::new(schema.clone())
        .with_header(true)
        .with_delimiter(config.delimiter)
        .with_quote(config.quote)
        .with_batch_size(config.batch_size)
        .build(file)?;

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

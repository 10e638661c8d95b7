//! Relational sink for the valid partition.
//!
//! A [`Connector`] hands out one [`Store`] per dataset; the store's
//! connection closes when it is dropped.

mod sqlite;

pub use sqlite::{SqliteConnector, SqliteStore};

use crate::config::StoreConfig;
use crate::errors::StoreError;
use crate::types::RowSet;

/// Knobs for a single bulk load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub batch_size: usize,
    pub truncate_first: bool,
    pub create_table: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            truncate_first: true,
            create_table: true,
        }
    }
}

impl From<&StoreConfig> for LoadOptions {
    fn from(config: &StoreConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            truncate_first: config.truncate_first,
            create_table: config.create_tables,
        }
    }
}

pub trait Store {
    /// Write `rows` into `table` using the listed `columns`, all or nothing.
    ///
    /// Returns the number of rows submitted.
    fn load(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &RowSet,
        options: &LoadOptions,
    ) -> Result<usize, StoreError>;
}

pub trait Connector {
    fn connect(&self) -> Result<Box<dyn Store>, StoreError>;

    /// Human-readable target, for logs.
    fn target(&self) -> String;
}

/// Quote a single identifier. Dots are part of the name.
pub(crate) fn quote_column(name: &str) -> Result<String, StoreError> {
    if name.trim().is_empty() || name.contains('"') || name.contains('\0') {
        return Err(StoreError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("\"{name}\""))
}

/// Quote a possibly schema-qualified table name (`schema.table`).
pub(crate) fn quote_table(name: &str) -> Result<String, StoreError> {
    let parts = name
        .split('.')
        .map(quote_column)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| StoreError::InvalidIdentifier(name.to_string()))?;
    Ok(parts.join("."))
}

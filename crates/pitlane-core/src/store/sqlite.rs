use std::path::{Path, PathBuf};
use std::time::Duration;

use arrow::array::{Array, AsArray, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::compute;
use arrow::datatypes::{DataType, Float64Type, Int64Type};
use rusqlite::types::Value;
use rusqlite::{Connection, Transaction, params_from_iter};
use tracing::{debug, warn};

use crate::errors::StoreError;
use crate::store::{Connector, LoadOptions, Store, quote_column, quote_table};
use crate::types::RowSet;
use crate::writer::ensure_parent_dir;

/// Upper bound on bound parameters per statement in the bundled SQLite.
const MAX_BOUND_PARAMETERS: usize = 32766;

/// One store column, pulled out of the row set with its concrete type.
enum ColumnValues {
    Absent,
    Text(StringArray),
    Real(Float64Array),
    Integer(Int64Array),
    Flag(BooleanArray),
}

impl ColumnValues {
    fn extract(rows: &RowSet, column: &str) -> Result<Self, StoreError> {
        let Some(array) = rows.column_by_name(column) else {
            return Ok(Self::Absent);
        };
        let values = match array.data_type() {
            DataType::Utf8 => Self::Text(array.as_string::<i32>().clone()),
            DataType::Float64 => Self::Real(array.as_primitive::<Float64Type>().clone()),
            DataType::Int64 => Self::Integer(array.as_primitive::<Int64Type>().clone()),
            DataType::Boolean => Self::Flag(array.as_boolean().clone()),
            _ => {
                let cast = compute::cast(array, &DataType::Utf8).map_err(|source| {
                    StoreError::Conversion {
                        column: column.to_string(),
                        source,
                    }
                })?;
                Self::Text(cast.as_string::<i32>().clone())
            }
        };
        Ok(values)
    }

    fn value(&self, row: usize) -> Value {
        match self {
            Self::Absent => Value::Null,
            Self::Text(a) if a.is_valid(row) => Value::Text(a.value(row).to_string()),
            Self::Real(a) if a.is_valid(row) => Value::Real(a.value(row)),
            Self::Integer(a) if a.is_valid(row) => Value::Integer(a.value(row)),
            Self::Flag(a) if a.is_valid(row) => Value::Integer(i64::from(a.value(row))),
            _ => Value::Null,
        }
    }
}

/// Rows per INSERT, bounded so one statement never exceeds the parameter limit.
fn effective_batch_size(requested: usize, column_count: usize) -> usize {
    let ceiling = (MAX_BOUND_PARAMETERS / column_count.max(1)).max(1);
    requested.clamp(1, ceiling)
}

fn insert_sql(table: &str, quoted_columns: &str, placeholders: &str, rows: usize) -> String {
    let values = vec![placeholders; rows].join(", ");
    format!("INSERT INTO {table} ({quoted_columns}) VALUES {values}")
}

/// SQLite-backed [`Store`]. Owns a single connection.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path, busy_timeout: Duration) -> Result<Self, StoreError> {
        ensure_parent_dir(path)?;
        let connect_err = |source| StoreError::Connect {
            path: path.display().to_string(),
            source,
        };
        let conn = Connection::open(path).map_err(connect_err)?;
        conn.busy_timeout(busy_timeout).map_err(connect_err)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Connect {
            path: ":memory:".to_string(),
            source,
        })?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn count_rows(&self, table: &str) -> Result<usize, StoreError> {
        let quoted = quote_table(table)?;
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {quoted}"), [], |row| row.get(0))
            .map_err(|source| StoreError::Execute {
                table: table.to_string(),
                source,
            })?;
        Ok(count as usize)
    }

    fn write_all(
        tx: &Transaction<'_>,
        table: &str,
        columns: &[String],
        rows: &RowSet,
        options: &LoadOptions,
    ) -> Result<(), StoreError> {
        let execute_err = |source| StoreError::Execute {
            table: table.to_string(),
            source,
        };
        let quoted_table = quote_table(table)?;
        let quoted_columns = columns
            .iter()
            .map(|c| quote_column(c))
            .collect::<Result<Vec<_>, _>>()?;

        if options.create_table {
            let definitions = quoted_columns
                .iter()
                .map(|c| format!("{c} NUMERIC"))
                .collect::<Vec<_>>()
                .join(", ");
            tx.execute(
                &format!("CREATE TABLE IF NOT EXISTS {quoted_table} ({definitions})"),
                [],
            )
            .map_err(execute_err)?;
        }

        if options.truncate_first {
            let removed = tx
                .execute(&format!("DELETE FROM {quoted_table}"), [])
                .map_err(execute_err)?;
            debug!(table, removed, "Truncated table");
        }

        let extracted = columns
            .iter()
            .map(|c| ColumnValues::extract(rows, c))
            .collect::<Result<Vec<_>, _>>()?;

        let batch_size = effective_batch_size(options.batch_size, columns.len());
        let column_list = quoted_columns.join(", ");
        let placeholders = format!("({})", vec!["?"; columns.len()].join(", "));

        let total = rows.num_rows();
        let mut start = 0;
        while start < total {
            let len = batch_size.min(total - start);
            let sql = insert_sql(&quoted_table, &column_list, &placeholders, len);
            let mut stmt = tx.prepare_cached(&sql).map_err(execute_err)?;
            let params = (start..start + len)
                .flat_map(|row| extracted.iter().map(move |col| col.value(row)));
            stmt.execute(params_from_iter(params)).map_err(execute_err)?;
            debug!(table, offset = start, rows = len, "Inserted batch");
            start += len;
        }
        Ok(())
    }
}

impl Store for SqliteStore {
    fn load(
        &mut self,
        table: &str,
        columns: &[String],
        rows: &RowSet,
        options: &LoadOptions,
    ) -> Result<usize, StoreError> {
        if columns.is_empty() {
            return Err(StoreError::NoColumns(table.to_string()));
        }

        let tx = self.conn.transaction().map_err(|source| StoreError::Execute {
            table: table.to_string(),
            source,
        })?;

        match Self::write_all(&tx, table, columns, rows, options) {
            Ok(()) => {
                tx.commit().map_err(|source| StoreError::Commit {
                    table: table.to_string(),
                    source,
                })?;
                Ok(rows.num_rows())
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback() {
                    warn!(table, error = %rollback, "Rollback failed");
                }
                Err(e)
            }
        }
    }
}

/// Opens a fresh [`SqliteStore`] on the same database file for each dataset.
#[derive(Debug, Clone)]
pub struct SqliteConnector {
    path: PathBuf,
    busy_timeout: Duration,
}

impl SqliteConnector {
    pub fn new(path: impl Into<PathBuf>, busy_timeout: Duration) -> Self {
        Self {
            path: path.into(),
            busy_timeout,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Connector for SqliteConnector {
    fn connect(&self) -> Result<Box<dyn Store>, StoreError> {
        Ok(Box::new(SqliteStore::open(&self.path, self.busy_timeout)?))
    }

    fn target(&self) -> String {
        format!("sqlite://{}", self.path.display())
    }
}

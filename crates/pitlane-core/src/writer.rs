use std::fs;
use std::path::Path;

use arrow::csv::WriterBuilder;

use crate::errors::IngestError;
use crate::types::RowSet;

/// Create the parent directory of `path` if it does not exist yet.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Write `rows` as CSV with a header row and no index column. Nulls become empty cells.
///
/// The file is only created once the whole payload has been encoded.
pub fn write_csv(path: &Path, rows: &RowSet) -> Result<(), IngestError> {
    let mut buffer = Vec::new();
    {
        let mut writer = WriterBuilder::new().with_header(true).build(&mut buffer);
        writer.write(rows)?;
    }

    ensure_parent_dir(path)?;
    fs::write(path, buffer)?;
    Ok(())
}

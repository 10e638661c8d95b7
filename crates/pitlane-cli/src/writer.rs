use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

/// Where the JSON run report goes.
///
/// `None` or an existing directory gets a timestamped file name; anything
/// else is used as the file path, creating missing parent directories.
pub fn resolve_file_path(path: &Option<String>, timestamp: &str) -> Result<PathBuf> {
    let base_path = path.as_deref().unwrap_or(".");
    let path = Path::new(base_path);
    let filename = format!("ingestion_{}.json", timestamp);

    let output_path = if path.exists() {
        if path.is_dir() {
            path.join(&filename)
        } else {
            path.to_path_buf()
        }
    } else if base_path.ends_with('/') || base_path.ends_with('\\') {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory: {}", path.display()))?;
        path.join(filename)
    } else {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }
        path.to_path_buf()
    };
    Ok(output_path)
}

pub fn write_report(path: &Path, content: &str) -> Result<()> {
    fs::write(path, content)
        .with_context(|| format!("Failed to write report: {}", path.display()))
}

//! CSV files in and out.
//!
//! Column names come from the record types' serde renames, so a file
//! written by `export` reads back unchanged after editing.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CliError;

/// Read every row of `path`. Cells are trimmed.
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, CliError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| CliError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| CliError::csv(path, e))
}

/// Write `rows` to `path`, replacing any existing file.
pub fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), CliError> {
    let mut writer = csv::Writer::from_path(path).map_err(|e| CliError::csv(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| CliError::csv(path, e))?;
    }
    writer.flush()?;
    Ok(())
}

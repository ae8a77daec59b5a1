//! CSV input and output.
//!
//! Descriptions are read from a header-less CSV (first column only). Tables
//! are written with a header row; a null cell is written as an empty field
//! and read back as `None`.

use std::path::Path;

use tracing::debug;

use crate::core::errors::{OptimusError, Result};
use crate::core::loader::InputData;

/// A string table with a header row and nullable cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    /// Column names
    pub headers: Vec<String>,
    /// Rows, each as long as `headers`
    pub rows: Vec<Vec<Option<String>>>,
}

impl Frame {
    /// Position of a column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Values of a column, top to bottom.
    pub fn column(&self, name: &str) -> Option<Vec<Option<String>>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row.get(idx).cloned().flatten()).collect())
    }
}

/// Read descriptions from a header-less CSV file.
pub fn read_descriptions(path: &Path) -> Result<InputData> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| OptimusError::input(format!("Failed to open {}: {e}", path.display())))?;

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record?;
        records.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    debug!("Read {} description rows from {}", records.len(), path.display());
    Ok(InputData::Records(records))
}

/// Read a table written by [`write_frame`].
pub fn read_frame(path: &Path) -> Result<Frame> {
    let mut reader = csv::ReaderBuilder::new()
        .from_path(path)
        .map_err(|e| OptimusError::input(format!("Failed to open {}: {e}", path.display())))?;

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
            .collect();
        rows.push(row);
    }
    Ok(Frame { headers, rows })
}

/// Write a table with a header row.
pub fn write_frame(path: &Path, frame: &Frame) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&frame.headers)?;
    for row in &frame.rows {
        writer.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    writer.flush()?;
    debug!("Wrote {} rows to {}", frame.rows.len(), path.display());
    Ok(())
}

use std::path::Path;

use log::debug;

use super::model::{Dataset, Row, Value};
use crate::error::{CleaningError, Result};

/// Columns every listings file must carry.
pub const REQUIRED_COLUMNS: &[&str] = &["price", "longitude", "latitude", "last_review"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a listings CSV, requiring [`REQUIRED_COLUMNS`].
pub fn load_csv(path: &Path) -> Result<Dataset> {
    load_csv_with(path, REQUIRED_COLUMNS)
}

/// CSV layout: header row with column names, one record per line.
/// Cells keep their source text (see [`Value::from_field`]).
pub fn load_csv_with(path: &Path, required: &[&str]) -> Result<Dataset> {
    if !path.is_file() {
        return Err(CleaningError::NotFound(path.to_path_buf()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| CleaningError::Parse {
            row: 0,
            column: None,
            detail: format!("unreadable header: {e}"),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    for col in required {
        if !columns.iter().any(|c| c == col) {
            return Err(CleaningError::missing_column(col));
        }
    }

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| CleaningError::Parse {
            row: row_no,
            column: None,
            detail: e.to_string(),
        })?;

        let values = record.iter().map(Value::from_field).collect();
        rows.push(Row {
            index: row_no,
            values,
        });
    }

    debug!(
        "Loaded {} rows x {} columns from {}",
        rows.len(),
        columns.len(),
        path.display()
    );

    Ok(Dataset::new(columns, rows))
}

use std::path::Path;

use chrono::{NaiveDateTime, Timelike};

use super::model::{Dataset, Value};
use crate::error::{CleaningError, Result};

/// Serialize `dataset` to `path`, overwriting any existing file.
///
/// The header is always written, so an empty dataset produces a header-only
/// file. Datetime columns render as `YYYY-MM-DD` when every value in the
/// column falls on midnight and as `YYYY-MM-DD HH:MM:SS[.f]` otherwise.
pub fn write_csv(dataset: &Dataset, path: &Path) -> Result<()> {
    let date_only = date_only_columns(dataset);

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(&dataset.columns)?;

    let mut fields: Vec<String> = Vec::with_capacity(dataset.columns.len());
    for row in &dataset.rows {
        fields.clear();
        for (col, value) in row.values.iter().enumerate() {
            fields.push(render(value, date_only.get(col).copied().unwrap_or(true)));
        }
        writer.write_record(&fields)?;
    }

    writer.flush().map_err(|e| CleaningError::io(path, e))?;
    Ok(())
}

fn render(value: &Value, date_only: bool) -> String {
    match value {
        Value::Null => String::new(),
        Value::DateTime(dt) if date_only => dt.format("%Y-%m-%d").to_string(),
        other => other.to_string(),
    }
}

/// For each column: true when it holds no datetime with a time-of-day part.
fn date_only_columns(dataset: &Dataset) -> Vec<bool> {
    let mut date_only = vec![true; dataset.columns.len()];
    for row in &dataset.rows {
        for (col, value) in row.values.iter().enumerate() {
            if let (Value::DateTime(dt), Some(flag)) = (value, date_only.get_mut(col)) {
                if !is_midnight(dt) {
                    *flag = false;
                }
            }
        }
    }
    date_only
}

fn is_midnight(dt: &NaiveDateTime) -> bool {
    dt.num_seconds_from_midnight() == 0 && dt.nanosecond() == 0
}

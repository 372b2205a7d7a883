use chrono::{DateTime, NaiveDate, NaiveDateTime};

use super::model::{Dataset, Value};
use crate::error::{CleaningError, Result};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%Y%m%d"];

/// Parse one raw value into a canonical datetime. Offsets are folded into UTC.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Return a copy of `dataset` with `column` coerced to [`Value::DateTime`].
///
/// Nulls stay null. The first value that does not parse aborts the whole
/// operation; nothing is silently turned into a null.
pub fn normalize_datetime(dataset: &Dataset, column: &str) -> Result<Dataset> {
    let idx = dataset.column_index(column)?;

    let mut out = dataset.clone();
    for row in &mut out.rows {
        let Some(cell) = row.values.get_mut(idx) else {
            continue;
        };
        let normalized = match &*cell {
            Value::Null => Value::Null,
            Value::DateTime(dt) => Value::DateTime(*dt),
            other => {
                let raw = other.to_string();
                let dt = parse_datetime(&raw).ok_or_else(|| CleaningError::Parse {
                    row: row.index,
                    column: Some(column.to_string()),
                    detail: format!("'{raw}' is not a recognised date/time"),
                })?;
                Value::DateTime(dt)
            }
        };
        *cell = normalized;
    }
    Ok(out)
}

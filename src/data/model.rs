use std::fmt;

use chrono::NaiveDateTime;

use crate::error::{CleaningError, Result};

// ---------------------------------------------------------------------------
// Value – a single cell of the dataset
// ---------------------------------------------------------------------------

/// A single cell.
///
/// Loaded cells keep their source text verbatim as [`Value::String`]; numeric
/// and datetime readings are taken only by the steps that need them, so
/// columns no step touches are written back byte for byte.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    /// Canonical datetime, produced by the datetime normalizer.
    DateTime(NaiveDateTime),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S%.f")),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Wrap a raw CSV field. An empty field is a null.
    pub fn from_field(s: &str) -> Value {
        if s.is_empty() {
            Value::Null
        } else {
            Value::String(s.to_string())
        }
    }

    /// Numeric reading of the value for range predicates.
    ///
    /// Text is parsed on demand. `f64::from_str` also accepts "nan" / "inf";
    /// those read as non-numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Row – one record of the source file
// ---------------------------------------------------------------------------

static NULL: Value = Value::Null;

/// A single record. Values are stored in the dataset's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// 0-based position of the record in the loaded file. Survives filtering
    /// so errors can point back at the source data.
    pub index: usize,
    pub values: Vec<Value>,
}

impl Row {
    pub fn get(&self, column: usize) -> &Value {
        self.values.get(column).unwrap_or(&NULL)
    }
}

// ---------------------------------------------------------------------------
// Dataset – an ordered table
// ---------------------------------------------------------------------------

/// An in-memory table: ordered column names and ordered rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Dataset { columns, rows }
    }

    /// Position of `name` in the header, or a schema error.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| CleaningError::missing_column(name))
    }

    /// Build a new dataset from the rows that satisfy `keep`.
    ///
    /// Rows are cloned, so the result never aliases `self`.
    pub fn select<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Row) -> bool,
    {
        let rows = self.rows.iter().filter(|row| keep(row)).cloned().collect();
        Dataset {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

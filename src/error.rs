use std::path::PathBuf;

use thiserror::Error;

use crate::registry::RegistryError;

/// Errors raised by the cleaning components.
///
/// Every variant is fatal to a run; the orchestrator wraps them with the
/// failing stage but never rewrites them.
#[derive(Error, Debug)]
pub enum CleaningError {
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("parse error at row {row}{}: {detail}", column_suffix(.column))]
    Parse {
        row: usize,
        column: Option<String>,
        detail: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, CleaningError>;

impl CleaningError {
    pub fn missing_column(column: &str) -> Self {
        CleaningError::Schema(format!("missing required column '{column}'"))
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CleaningError::Io {
            path: path.into(),
            source,
        }
    }
}

fn column_suffix(column: &Option<String>) -> String {
    match column {
        Some(col) => format!(", column '{col}'"),
        None => String::new(),
    }
}

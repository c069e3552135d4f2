use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Load-time errors
// ---------------------------------------------------------------------------

/// Everything that can abort loading a record file.
///
/// All three variants are fatal for the load: no partially normalized table
/// is ever handed to the view.
#[derive(Error, Debug)]
pub enum LoadError {
    /// The file is missing, unreadable, malformed or of an unsupported kind.
    #[error("cannot load {}: {message}", .path.display())]
    DataLoad { path: PathBuf, message: String },

    /// A required column is absent from the header row.
    #[error("{}: missing required column '{column}'", .path.display())]
    Schema { path: PathBuf, column: String },

    /// A cell could not be cast to the type its column declares.
    /// `row` is the 1-based data row (header excluded).
    #[error("row {row}, column '{column}': cannot read '{value}' as {expected}")]
    TypeCoercion {
        row: usize,
        column: String,
        value: String,
        expected: &'static str,
    },
}

impl LoadError {
    pub fn data_load(path: impl Into<PathBuf>, message: impl std::fmt::Display) -> Self {
        LoadError::DataLoad {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn coercion(
        row: usize,
        column: &str,
        value: impl std::fmt::Display,
        expected: &'static str,
    ) -> Self {
        LoadError::TypeCoercion {
            row,
            column: column.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

pub type LoadResult<T> = std::result::Result<T, LoadError>;

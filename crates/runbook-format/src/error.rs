//! Error types for the notebook file reader.

use std::path::PathBuf;

/// Result type for notebook file operations.
pub type FormatResult<T> = Result<T, FormatError>;

/// Errors that can occur while reading a notebook file.
#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    /// Failed to read the notebook file.
    #[error("Failed to read file {path}: {message}")]
    ReadError { path: PathBuf, message: String },

    /// Failed to parse notebook JSON.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Structurally invalid notebook.
    #[error("Invalid notebook: {0}")]
    InvalidNotebook(String),

    /// Notebook format version this reader cannot upgrade.
    #[error("Unsupported notebook format version {0}")]
    UnsupportedVersion(u64),
}

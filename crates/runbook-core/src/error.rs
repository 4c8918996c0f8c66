//! Error types for runbook-core.

use thiserror::Error;

/// Result type for runbook-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in runbook-core.
#[derive(Debug, Error)]
pub enum Error {
    /// Failed to read or parse the notebook file.
    #[error(transparent)]
    Format(#[from] runbook_format::FormatError),

    /// A code cell failed to compile.
    #[error("compile error in {cell}: {source}")]
    Compile {
        cell: String,
        #[source]
        source: mlua::Error,
    },

    /// A strict tag lookup matched no cells.
    #[error("tag not found: {0}")]
    TagNotFound(String),

    /// A cell raised an error while executing.
    #[error("execution error in {cell}: {source}")]
    Execution {
        cell: String,
        #[source]
        source: mlua::Error,
    },

    /// Interpreter or namespace access error.
    #[error("lua error: {0}")]
    Lua(#[from] mlua::Error),

    /// Failed to switch or restore the working directory.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid notebook options.
    #[error("invalid configuration: {0}")]
    Config(String),
}

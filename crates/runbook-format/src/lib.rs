//! Notebook file reader for runbook.
//!
//! Parses `.ipynb` JSON into an ordered list of typed raw cells, upgrading
//! legacy nbformat 3 documents to the canonical v4 shape on the way in.
//! Read-only: runbook consumes notebook files and never writes them.

mod error;
mod ipynb;

pub use error::{FormatError, FormatResult};
pub use ipynb::{
    CURRENT_NBFORMAT, CellKind, RawCell, RawCellMetadata, RawNotebook, SourceText, parse_notebook,
    read_notebook,
};

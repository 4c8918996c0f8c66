//! Jupyter notebook (.ipynb) reading.
//!
//! Parses `.ipynb` JSON into typed raw cells. Legacy nbformat 3 documents
//! are upgraded to the v4 shape before the typed parse, so downstream code
//! only ever sees the canonical format.

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{FormatError, FormatResult};

/// The notebook format version everything is upgraded to.
pub const CURRENT_NBFORMAT: u64 = 4;

/// A parsed notebook in the canonical (v4) shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RawNotebook {
    /// Major format version (always [`CURRENT_NBFORMAT`] after upgrade)
    pub nbformat: u64,

    /// Minor format version
    #[serde(default)]
    pub nbformat_minor: u64,

    /// Notebook-level metadata, kept verbatim
    #[serde(default)]
    pub metadata: Value,

    /// Cells in document order
    pub cells: Vec<RawCell>,
}

/// One raw notebook cell.
#[derive(Debug, Clone, Deserialize)]
pub struct RawCell {
    /// Cell type
    pub cell_type: CellKind,

    /// Cell source
    #[serde(default)]
    pub source: SourceText,

    /// Cell metadata
    #[serde(default)]
    pub metadata: RawCellMetadata,
}

/// Cell type, as stored in the `cell_type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellKind {
    /// Executable code cell
    Code,
    /// Markdown documentation cell
    Markdown,
    /// Raw passthrough cell
    Raw,
    /// Any cell type this reader does not execute or tag
    #[serde(other)]
    Other,
}

/// Cell source as stored on disk: one joined string or a list of lines.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SourceText {
    /// Single pre-joined string
    Joined(String),
    /// List of lines, each usually carrying its own trailing newline
    Lines(Vec<String>),
}

impl SourceText {
    /// The source as a single string.
    pub fn text(&self) -> String {
        match self {
            SourceText::Joined(s) => s.clone(),
            SourceText::Lines(lines) => lines.concat(),
        }
    }

    /// Whether the source is empty.
    pub fn is_empty(&self) -> bool {
        match self {
            SourceText::Joined(s) => s.is_empty(),
            SourceText::Lines(lines) => lines.iter().all(|l| l.is_empty()),
        }
    }
}

impl Default for SourceText {
    fn default() -> Self {
        SourceText::Joined(String::new())
    }
}

/// The subset of cell metadata this reader consumes.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCellMetadata {
    /// Explicit tags attached in the notebook editor
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Read and parse a notebook file.
pub fn read_notebook(path: impl AsRef<Path>) -> FormatResult<RawNotebook> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| FormatError::ReadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    parse_notebook(&content)
}

/// Parse notebook JSON, upgrading legacy versions to the v4 shape.
pub fn parse_notebook(json: &str) -> FormatResult<RawNotebook> {
    let value: Value = serde_json::from_str(json)?;
    let version = value
        .get("nbformat")
        .and_then(Value::as_u64)
        .ok_or_else(|| FormatError::InvalidNotebook("missing nbformat field".to_string()))?;

    let value = match version {
        CURRENT_NBFORMAT => value,
        3 => upgrade_v3(value)?,
        other => return Err(FormatError::UnsupportedVersion(other)),
    };

    let notebook: RawNotebook = serde_json::from_value(value)?;
    Ok(notebook)
}

/// Upgrade an nbformat 3 document to the v4 shape.
///
/// Worksheets are flattened in order, code cells rename `input` to `source`,
/// and `heading` cells are rewritten as markdown cells.
fn upgrade_v3(value: Value) -> FormatResult<Value> {
    let Value::Object(mut doc) = value else {
        return Err(FormatError::InvalidNotebook(
            "notebook root is not an object".to_string(),
        ));
    };

    let worksheets = doc.remove("worksheets").unwrap_or(Value::Array(Vec::new()));
    let Value::Array(worksheets) = worksheets else {
        return Err(FormatError::InvalidNotebook(
            "worksheets is not an array".to_string(),
        ));
    };

    let mut cells = Vec::new();
    for worksheet in worksheets {
        let ws_cells = worksheet
            .get("cells")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        for mut cell in ws_cells {
            let Some(obj) = cell.as_object_mut() else {
                continue;
            };

            match obj.get("cell_type").and_then(Value::as_str) {
                Some("code") => {
                    if let Some(input) = obj.remove("input") {
                        obj.insert("source".to_string(), input);
                    }
                }
                Some("heading") => {
                    let level = obj
                        .get("level")
                        .and_then(Value::as_u64)
                        .unwrap_or(1)
                        .clamp(1, 6) as usize;
                    let text = source_text(obj.get("source"));
                    obj.insert("cell_type".to_string(), Value::String("markdown".to_string()));
                    obj.insert(
                        "source".to_string(),
                        Value::String(format!("{} {}", "#".repeat(level), text)),
                    );
                }
                _ => {}
            }

            cells.push(cell);
        }
    }

    doc.insert("cells".to_string(), Value::Array(cells));
    doc.insert("nbformat".to_string(), Value::from(CURRENT_NBFORMAT));
    doc.insert("nbformat_minor".to_string(), Value::from(0u64));
    Ok(Value::Object(doc))
}

/// Decode a `source` field that may be missing, a string, or a line list.
fn source_text(value: Option<&Value>) -> String {
    value
        .and_then(|v| serde_json::from_value::<SourceText>(v.clone()).ok())
        .map(|s| s.text())
        .unwrap_or_default()
}
